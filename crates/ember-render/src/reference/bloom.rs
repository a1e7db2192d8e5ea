//! Bloom passes on float images, texel for texel what the GPU stage does.

use glam::{Vec2, Vec4};

use super::image::HdrImage;
use crate::bloom::{BloomConfig, gaussian_weights, high_pass, kernel_radius};
use crate::target::{TargetLayout, TargetSize};

/// Soft-knee luminance threshold, per pixel.
pub fn high_pass_image(scene: &HdrImage, config: &BloomConfig) -> HdrImage {
    scene.map(|p| high_pass(p.truncate(), config).extend(1.0))
}

/// One directional Gaussian pass from `source` into a `target`-sized image.
pub fn blur(
    source: &HdrImage,
    target: TargetSize,
    level: usize,
    direction: Vec2,
    config: &BloomConfig,
) -> HdrImage {
    let weights = gaussian_weights(kernel_radius(level));
    let texel = Vec2::from(target.texel());
    let step = direction * texel * config.tap_spacing();
    let mut out = HdrImage::new(target, Vec4::ZERO);
    for y in 0..target.height {
        for x in 0..target.width {
            let uv = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * texel;
            let mut sum = source.sample_bilinear(uv).truncate() * weights[0];
            for (k, &w) in weights.iter().enumerate().skip(1) {
                let offset = step * k as f32;
                sum += source.sample_bilinear(uv + offset).truncate() * w;
                sum += source.sample_bilinear(uv - offset).truncate() * w;
            }
            out.set(x, y, sum.extend(1.0));
        }
    }
    out
}

/// Intermediate and final images of one bloom evaluation.
#[derive(Clone, Debug)]
pub struct BloomImages {
    pub bright: HdrImage,
    pub horizontal: Vec<HdrImage>,
    pub vertical: Vec<HdrImage>,
    pub glow: HdrImage,
}

impl BloomImages {
    /// Run the blur chain and accumulation over a high-passed image.
    pub fn new(layout: &TargetLayout, bright: HdrImage) -> Self {
        Self {
            bright,
            horizontal: Vec::with_capacity(layout.level_count()),
            vertical: Vec::with_capacity(layout.level_count()),
            glow: HdrImage::new(layout.viewport, Vec4::ZERO),
        }
    }

    /// Blur `level`: level 0 reads the bright image, later levels the
    /// previous vertical result.
    pub fn blur_level(&mut self, layout: &TargetLayout, level: usize, config: &BloomConfig) {
        let Some(size) = layout.level(level) else {
            return;
        };
        let source = if level == 0 {
            &self.bright
        } else {
            &self.vertical[level - 1]
        };
        let horizontal = blur(source, size, level, Vec2::X, config);
        let vertical = blur(&horizontal, size, level, Vec2::Y, config);
        self.horizontal.push(horizontal);
        self.vertical.push(vertical);
    }

    /// Sum every blurred level into the glow image with its weight.
    pub fn accumulate(&mut self, config: &BloomConfig) {
        let size = self.glow.size();
        let texel = Vec2::from(size.texel());
        let mut glow = HdrImage::new(size, Vec4::ZERO);
        for y in 0..size.height {
            for x in 0..size.width {
                let uv = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * texel;
                let mut sum = glam::Vec3::ZERO;
                for (level, image) in self.vertical.iter().enumerate() {
                    sum += image.sample_bilinear(uv).truncate() * config.level_weight(level);
                }
                glow.set(x, y, sum.extend(1.0));
            }
        }
        self.glow = glow;
    }
}

/// Run every bloom step on `scene`.
pub fn bloom(scene: &HdrImage, layout: &TargetLayout, config: &BloomConfig) -> BloomImages {
    let mut images = BloomImages::new(layout, high_pass_image(scene, config));
    for level in 0..layout.level_count() {
        images.blur_level(layout, level, config);
    }
    images.accumulate(config);
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_source(size: u32, at: (u32, u32), value: f32) -> HdrImage {
        let mut image = HdrImage::new(TargetSize::new(size, size), Vec4::ZERO);
        image.set(at.0, at.1, Vec4::new(value, value, value, 1.0));
        image
    }

    #[test]
    fn test_zero_input_gives_exact_zero_glow() {
        let layout = TargetLayout::for_viewport(64, 64, 3);
        let scene = HdrImage::new(layout.viewport, Vec4::ZERO);
        let images = bloom(&scene, &layout, &BloomConfig::default());
        assert_eq!(images.glow.max_rgb(), 0.0);
        assert_eq!(images.vertical.len(), 3);
    }

    #[test]
    fn test_dim_input_is_below_threshold() {
        let layout = TargetLayout::for_viewport(32, 32, 2);
        let scene = HdrImage::new(layout.viewport, Vec4::new(0.1, 0.1, 0.1, 1.0));
        let images = bloom(&scene, &layout, &BloomConfig::default());
        assert_eq!(images.glow.max_rgb(), 0.0);
    }

    #[test]
    fn test_glow_stays_within_footprint() {
        let config = BloomConfig {
            levels: 2,
            ..Default::default()
        };
        let layout = TargetLayout::for_viewport(128, 128, config.levels);
        let scene = point_source(128, (64, 64), 10.0);
        let images = bloom(&scene, &layout, &config);
        let reach = config.footprint();
        let mut lit = 0;
        for (x, y) in images.glow.nonzero_pixels() {
            let dx = (x as f32 - 64.0).abs();
            let dy = (y as f32 - 64.0).abs();
            assert!(dx <= reach && dy <= reach, "glow at ({x}, {y}), reach {reach}");
            lit += 1;
        }
        assert!(lit > 0);
    }

    #[test]
    fn test_level_sizes_follow_layout() {
        let layout = TargetLayout::for_viewport(100, 60, 3);
        let mut scene = HdrImage::new(layout.viewport, Vec4::ZERO);
        scene.set(10, 10, Vec4::ONE);
        let images = bloom(&scene, &layout, &BloomConfig::default());
        let sizes: Vec<TargetSize> = images.vertical.iter().map(HdrImage::size).collect();
        assert_eq!(sizes, layout.levels);
        assert_eq!(images.glow.size(), layout.viewport);
    }

    #[test]
    fn test_strength_scales_glow_linearly() {
        let layout = TargetLayout::for_viewport(32, 32, 2);
        let scene = point_source(32, (16, 16), 4.0);
        let config = |strength| BloomConfig {
            strength,
            levels: 2,
            ..Default::default()
        };
        let weak = bloom(&scene, &layout, &config(0.5));
        let strong = bloom(&scene, &layout, &config(1.0));
        let ratio = strong.glow.max_rgb() / weak.glow.max_rgb();
        assert!((ratio - 2.0).abs() < 1e-4, "{ratio}");
    }
}
