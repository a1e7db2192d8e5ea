//! Shadow prepass: light-space depth of every shadow caster.

use std::collections::HashMap;

use ember_lighting::{DirectionalLight, ShadowMap, ShadowMapConfig};

use crate::buffer::BufferAllocator;
use crate::camera::CameraUniform;
use crate::pass::{begin_depth_pass, draw_depth};
use crate::scene::ObjectId;
use crate::surface_pipeline::{GpuObject, SurfaceLayouts, SurfacePipelines};

/// Rasterizer bias of the shadow depth pipelines.
pub fn shadow_depth_bias(config: &ShadowMapConfig) -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: config.depth_bias_constant,
        slope_scale: config.depth_bias_slope,
        clamp: 0.0,
    }
}

/// Shadow map plus the light camera and the bind group the lit pass samples.
pub struct ShadowStage {
    pub map: ShadowMap,
    light_camera: wgpu::Buffer,
    light_camera_group: wgpu::BindGroup,
    uniform: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ShadowStage {
    /// Allocate the shadow map and its light camera.
    pub fn new(device: &wgpu::Device, layouts: &SurfaceLayouts, config: &ShadowMapConfig) -> Self {
        let map = ShadowMap::new(device, config);
        let allocator = BufferAllocator::new(device);
        let light_camera = allocator.create_uniform_buffer(
            "shadow-light-camera",
            &CameraUniform::new(map.light_matrix, glam::Vec3::ZERO),
        );
        let light_camera_group =
            layouts.camera_bind_group(device, "shadow-light-camera", &light_camera);
        let uniform = allocator.create_uniform_buffer("shadow-uniform", &map.to_uniform());
        let bind_group = layouts.shadow_bind_group(device, &uniform, &map);
        log::info!("Created {0}x{0} shadow map", config.resolution);
        Self {
            map,
            light_camera,
            light_camera_group,
            uniform,
            bind_group,
        }
    }

    /// Re-aim the shadow camera at the light's current placement.
    pub fn write(&mut self, queue: &wgpu::Queue, light: &DirectionalLight) {
        self.map.update(light);
        queue.write_buffer(
            &self.light_camera,
            0,
            bytemuck::bytes_of(&CameraUniform::new(self.map.light_matrix, light.position)),
        );
        queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&self.map.to_uniform()));
    }

    /// Draw every caster into the shadow map. Returns the number of draws.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        casters: &[ObjectId],
        objects: &HashMap<ObjectId, GpuObject>,
        pipelines: &SurfacePipelines,
    ) -> usize {
        let mut pass = begin_depth_pass(encoder, "shadow-depth", &self.map.view);
        draw_depth(&mut pass, casters, objects, pipelines, &self.light_camera_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_follows_config() {
        let bias = shadow_depth_bias(&ShadowMapConfig::default());
        assert_eq!(bias.constant, 2);
        assert_eq!(bias.slope_scale, 1.75);
    }
}
