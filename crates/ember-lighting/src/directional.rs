//! Directional light aimed from a position at a target.
//!
//! [`DirectionalLight`] is the CPU-side description; [`DirectionalLightUniform`]
//! is written to a uniform buffer each frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// CPU-side directional light.
///
/// Like a spotlight with an infinitely distant source: every surface is lit
/// from the same direction, `target - position`. The position only matters
/// for placing the shadow camera.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    /// Linear RGB, not premultiplied by intensity.
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -5.0),
            target: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl DirectionalLight {
    /// Light at `position` pointing at the origin.
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            color,
            intensity,
            ..Default::default()
        }
    }

    /// Normalized direction the light travels (from the light toward the target).
    ///
    /// Falls back to `-Y` when position and target coincide.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }

    /// Light color premultiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Uniform for the lit passes.
    pub fn to_uniform(&self) -> DirectionalLightUniform {
        let d = self.direction();
        DirectionalLightUniform {
            direction_intensity: [d.x, d.y, d.z, self.intensity],
            color_padding: [self.color.x, self.color.y, self.color.z, 0.0],
        }
    }
}

/// GPU-side representation, 32 bytes.
///
/// Bound at `@group(1) @binding(0)` in the surface pipelines.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = direction (normalized), w = intensity.
    pub direction_intensity: [f32; 4],
    /// xyz = color (linear RGB), w = padding.
    pub color_padding: [f32; 4],
}
