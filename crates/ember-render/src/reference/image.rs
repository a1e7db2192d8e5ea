//! Float RGBA image used by every reference pass.

use glam::{Vec2, Vec4};

use crate::target::TargetSize;

/// Row-major RGBA float image, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct HdrImage {
    size: TargetSize,
    pixels: Vec<Vec4>,
}

impl HdrImage {
    /// Image of `size` filled with one value.
    pub fn new(size: TargetSize, fill: Vec4) -> Self {
        Self {
            size,
            pixels: vec![fill; size.pixel_count()],
        }
    }

    /// Image dimensions.
    pub fn size(&self) -> TargetSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Row-major, top row first.
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.size.width + x) as usize
    }

    /// Pixel at `(x, y)`; panics outside the image.
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[self.index(x, y)]
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set(&mut self, x: u32, y: u32, value: Vec4) {
        let i = self.index(x, y);
        self.pixels[i] = value;
    }

    /// Texel fetch with coordinates clamped to the edge.
    pub fn fetch_clamped(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.size.width as i64 - 1) as u32;
        let y = y.clamp(0, self.size.height as i64 - 1) as u32;
        self.get(x, y)
    }

    /// Bilinear sample at normalized `uv`, clamp-to-edge, texel centers at
    /// `(i + 0.5) / size`.
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec4 {
        let x = uv.x * self.size.width as f32 - 0.5;
        let y = uv.y * self.size.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = self
            .fetch_clamped(x0, y0)
            .lerp(self.fetch_clamped(x0 + 1, y0), fx);
        let bottom = self
            .fetch_clamped(x0, y0 + 1)
            .lerp(self.fetch_clamped(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    /// New image of the same size with `f` applied per pixel.
    pub fn map(&self, f: impl Fn(Vec4) -> Vec4) -> Self {
        Self {
            size: self.size,
            pixels: self.pixels.iter().map(|&p| f(p)).collect(),
        }
    }

    /// Largest color channel over the whole image.
    pub fn max_rgb(&self) -> f32 {
        self.pixels
            .iter()
            .map(|p| p.truncate().max_element())
            .fold(0.0, f32::max)
    }

    /// Pixels whose color is not exactly black.
    pub fn nonzero_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.size.width;
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, p)| p.truncate() != glam::Vec3::ZERO)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }

    /// Quantize an already encoded image to 8-bit RGBA.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
                [q(p.x), q(p.y), q(p.z), q(p.w)]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilinear_at_texel_center_is_exact() {
        let mut image = HdrImage::new(TargetSize::new(2, 2), Vec4::ZERO);
        image.set(1, 0, Vec4::ONE);
        let uv = Vec2::new(1.5 / 2.0, 0.5 / 2.0);
        assert_eq!(image.sample_bilinear(uv), Vec4::ONE);
    }

    #[test]
    fn test_bilinear_midpoint_averages() {
        let mut image = HdrImage::new(TargetSize::new(2, 1), Vec4::ZERO);
        image.set(1, 0, Vec4::splat(2.0));
        let v = image.sample_bilinear(Vec2::new(0.5, 0.5));
        assert!((v.x - 1.0).abs() < 1e-6, "{v:?}");
    }

    #[test]
    fn test_bilinear_clamps_to_edge() {
        let mut image = HdrImage::new(TargetSize::new(2, 1), Vec4::ZERO);
        image.set(0, 0, Vec4::splat(3.0));
        assert_eq!(image.sample_bilinear(Vec2::new(-4.0, 0.5)), Vec4::splat(3.0));
    }

    #[test]
    fn test_zero_image_samples_exact_zero() {
        let image = HdrImage::new(TargetSize::new(5, 3), Vec4::ZERO);
        assert_eq!(image.sample_bilinear(Vec2::new(0.37, 0.81)), Vec4::ZERO);
        assert_eq!(image.nonzero_pixels().count(), 0);
        assert_eq!(image.max_rgb(), 0.0);
    }

    #[test]
    fn test_to_rgba8_quantizes() {
        let image = HdrImage::new(TargetSize::new(1, 1), Vec4::new(1.5, 0.5, -1.0, 1.0));
        assert_eq!(image.to_rgba8(), vec![255, 128, 0, 255]);
    }
}
