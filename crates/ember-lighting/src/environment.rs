//! Image-based ambient lighting.
//!
//! Until a cube map arrives the environment is a flat color; once faces are
//! loaded the GPU samples the cube for reflections while the flat color
//! becomes the faces' average and keeps feeding the diffuse term.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Environment lighting state shared by CPU and GPU shading.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentLighting {
    /// Flat or average radiance (linear RGB).
    pub color: Vec3,
    /// Scalar applied to all environment contributions.
    pub intensity: f32,
    /// Whether a cube map is bound for reflections.
    pub has_cube_map: bool,
}

impl Default for EnvironmentLighting {
    fn default() -> Self {
        Self::new(Vec3::new(0.25, 0.27, 0.32), 0.5)
    }
}

impl EnvironmentLighting {
    /// Flat ambient color with no cube map.
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            has_cube_map: false,
        }
    }

    /// Radiance arriving from any direction for the flat approximation.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Uniform for the lit passes.
    pub fn to_uniform(&self) -> EnvironmentUniform {
        EnvironmentUniform {
            color_intensity: [self.color.x, self.color.y, self.color.z, self.intensity],
            flags: [u32::from(self.has_cube_map), 0, 0, 0],
        }
    }
}

/// Mean linear color of sRGB-encoded RGBA8 pixels. Alpha is ignored.
pub fn average_linear_rgb(rgba8: &[u8]) -> Vec3 {
    let pixels = rgba8.chunks_exact(4);
    let count = pixels.len();
    if count == 0 {
        return Vec3::ZERO;
    }
    let sum: Vec3 = pixels
        .map(|p| {
            Vec3::new(
                srgb_to_linear(p[0]),
                srgb_to_linear(p[1]),
                srgb_to_linear(p[2]),
            )
        })
        .sum();
    sum / count as f32
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// GPU-side environment parameters, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct EnvironmentUniform {
    /// xyz = flat/average color, w = intensity.
    pub color_intensity: [f32; 4],
    /// x = 1 when the cube map holds real faces.
    pub flags: [u32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<EnvironmentUniform>(), 32);
    }

    #[test]
    fn test_default_intensity_is_half() {
        let env = EnvironmentLighting::default();
        assert_eq!(env.intensity, 0.5);
        assert!(!env.has_cube_map);
        assert_eq!(env.to_uniform().flags[0], 0);
    }

    #[test]
    fn test_average_of_white_and_black() {
        let pixels = [255, 255, 255, 255, 0, 0, 0, 255];
        let avg = average_linear_rgb(&pixels);
        assert!((avg - Vec3::splat(0.5)).length() < 1e-6, "avg {avg:?}");
    }

    #[test]
    fn test_average_decodes_srgb() {
        let pixels = [128, 128, 128, 255];
        let avg = average_linear_rgb(&pixels);
        assert!((avg.x - 0.2158).abs() < 1e-3, "avg {avg:?}");
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(average_linear_rgb(&[]), Vec3::ZERO);
    }
}
