//! Damped orbit controls around a target point.
//!
//! Pointer and wheel input accumulate into pending deltas; [`OrbitController::update`]
//! applies a damped share of them each frame and moves the camera.

use std::f32::consts::{PI, TAU};

use ember_config::SceneConfig;
use glam::Vec3;

use crate::camera::PerspectiveCamera;

/// Closest the camera gets to the poles, in radians. Large enough that the
/// angle survives an f32 round trip through the camera position.
const MIN_POLAR: f32 = 1.0e-2;
/// Frame rate the damping factor is specified at.
const REFERENCE_FPS: f32 = 60.0;
const MAX_STEP: f32 = 0.25;

/// Spherical coordinates around the target, y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Angle from +Y.
    pub phi: f32,
    /// Angle around +Y, measured from +Z towards +X.
    pub theta: f32,
}

impl Spherical {
    /// Decompose an offset from the target.
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    /// Cartesian offset from the target.
    pub fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Orbit camera controller with inertia.
#[derive(Clone, Debug)]
pub struct OrbitController {
    pub camera: PerspectiveCamera,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    delta_theta: f32,
    delta_phi: f32,
    zoom_scale: f32,
    last_time: Option<f32>,
}

impl OrbitController {
    /// Orbit around the camera's current target.
    pub fn new(camera: PerspectiveCamera, damping_factor: f32) -> Self {
        Self {
            camera,
            damping_factor: damping_factor.clamp(0.0, 1.0),
            enable_damping: damping_factor > 0.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.5,
            max_distance: 500.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
            last_time: None,
        }
    }

    /// Camera and damping from the scene config.
    pub fn from_config(config: &SceneConfig, width: u32, height: u32) -> Self {
        let mut camera = PerspectiveCamera {
            position: Vec3::from(config.camera_position),
            fov_y: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            ..Default::default()
        };
        camera.set_aspect_ratio(width, height);
        Self::new(camera, config.damping_factor)
    }

    /// Pointer drag in physical pixels. A drag across the full viewport
    /// height turns the camera once around.
    pub fn drag(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        let h = viewport_height.max(1) as f32;
        self.delta_theta -= TAU * dx / h * self.rotate_speed;
        self.delta_phi -= TAU * dy / h * self.rotate_speed;
    }

    /// Wheel input; negative values zoom in.
    pub fn wheel(&mut self, delta: f32) {
        let step = 0.95f32.powf(self.zoom_speed);
        if delta < 0.0 {
            self.zoom_scale *= step;
        } else if delta > 0.0 {
            self.zoom_scale /= step;
        }
    }

    /// Apply pending input for the frame at `time` seconds.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, time: f32) -> bool {
        let dt = match self.last_time {
            Some(last) => (time - last).clamp(0.0, MAX_STEP),
            None => 1.0 / REFERENCE_FPS,
        };
        self.last_time = Some(time);

        let share = if self.enable_damping {
            1.0 - (1.0 - self.damping_factor).powf(dt * REFERENCE_FPS)
        } else {
            1.0
        };

        let offset = self.camera.position - self.camera.target;
        let mut spherical = Spherical::from_offset(offset);
        spherical.theta += self.delta_theta * share;
        spherical.phi = (spherical.phi + self.delta_phi * share).clamp(MIN_POLAR, PI - MIN_POLAR);
        spherical.radius =
            (spherical.radius * self.zoom_scale).clamp(self.min_distance, self.max_distance);
        self.zoom_scale = 1.0;

        if self.enable_damping {
            self.delta_theta *= 1.0 - share;
            self.delta_phi *= 1.0 - share;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }

        let position = self.camera.target + spherical.to_offset();
        let moved = position.distance_squared(self.camera.position) > 1.0e-12;
        self.camera.position = position;
        moved
    }

    /// Update the camera aspect; a zero height is ignored.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        self.camera.set_aspect_ratio(width, height);
    }
}
