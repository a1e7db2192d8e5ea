//! Noise-driven displacement, dissolve and edge glow.
//!
//! A point's dissolve value is `clamp(snoise4(p * frequency, drift), -1, 1) *
//! PROCESS_EXTENT`. It does not depend on `process`, so raising `process`
//! only ever discards more of the surface.

use glam::Vec3;

use crate::hooks::{ShadingHooks, SurfaceInputs};
use crate::noise::{snoise3, snoise4};
use crate::params::{PROCESS_EXTENT, ShadingParams};

/// Signed offset along the normal at an object-space position.
pub fn displacement_offset(position: Vec3, params: &ShadingParams) -> f32 {
    snoise3(position * params.frequency) * params.displacement
}

/// Vertex position pushed along its normal by the noise offset.
pub fn displace_vertex(position: Vec3, normal: Vec3, params: &ShadingParams) -> Vec3 {
    position + normal * displacement_offset(position, params)
}

/// Dissolve value in `[-PROCESS_EXTENT, PROCESS_EXTENT]`.
pub fn dissolve_value(position: Vec3, params: &ShadingParams) -> f32 {
    let n = snoise4((position * params.frequency).extend(params.drift));
    n.clamp(-1.0, 1.0) * PROCESS_EXTENT
}

/// Discard rule shared by every variant.
#[inline]
pub fn is_discarded(value: f32, process: f32) -> bool {
    value < process
}

/// Whether a surviving value lies in the glowing band.
#[inline]
pub fn in_edge_band(value: f32, params: &ShadingParams) -> bool {
    value < params.process + params.edge_width
}

/// Dissolve hooks over one parameter snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DissolveHooks {
    pub params: ShadingParams,
}

impl DissolveHooks {
    /// Hooks over a snapshot of the shared parameters.
    pub fn new(params: ShadingParams) -> Self {
        Self { params }
    }
}

impl ShadingHooks for DissolveHooks {
    fn displace(&self, position: Vec3, normal: Vec3) -> Vec3 {
        displace_vertex(position, normal, &self.params)
    }

    fn discard(&self, object_position: Vec3) -> bool {
        is_discarded(dissolve_value(object_position, &self.params), self.params.process)
    }

    fn override_surface(&self, object_position: Vec3, inputs: SurfaceInputs) -> SurfaceInputs {
        let value = dissolve_value(object_position, &self.params);
        if in_edge_band(value, &self.params) {
            SurfaceInputs {
                emissive: self.params.edge_emissive(),
                metallic: 0.0,
                roughness: self.params.edge_roughness,
                ..inputs
            }
        } else {
            inputs
        }
    }
}
