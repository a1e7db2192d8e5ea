//! Perspective camera with reverse-Z projection.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Camera uniform data uploaded to the GPU, 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz = eye position, w = padding.
    pub position: [f32; 4],
}

impl CameraUniform {
    /// Camera uniform from a view-projection and eye position.
    pub fn new(view_proj: Mat4, position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            position: position.extend(1.0).to_array(),
        }
    }
}

/// A look-at perspective camera.
#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 5.0, -5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 75f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl PerspectiveCamera {
    /// Right-handed look-at towards `target`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Near plane maps to depth 1, far plane to 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.far, self.near)
    }

    /// Projection times view, reverse-Z.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update the aspect ratio. Zero heights are ignored.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Unit vector from the eye to the target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Uniform for the lit and depth passes.
    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform::new(self.view_projection_matrix(), self.position)
    }
}
