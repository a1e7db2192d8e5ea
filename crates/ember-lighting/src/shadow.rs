//! Single shadow map for the directional light, sampled with 3x3 PCF.
//!
//! Depth uses the reverse-Z convention throughout: 1 at the light's near
//! plane, 0 at its far plane, so a fragment is lit when its depth is greater
//! than or equal to the stored occluder depth.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::directional::DirectionalLight;

/// Shadow camera and filtering parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowMapConfig {
    /// Width = height of the depth texture.
    pub resolution: u32,
    /// Half-extent of the orthographic shadow volume in world units.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
    /// Rasterizer depth bias (constant term), in depth units.
    pub depth_bias_constant: i32,
    /// Rasterizer depth bias slope factor.
    pub depth_bias_slope: f32,
    /// Bias added to the fragment depth before comparison.
    pub compare_bias: f32,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            half_extent: 5.0,
            near: 0.5,
            far: 500.0,
            depth_bias_constant: 2,
            depth_bias_slope: 1.75,
            compare_bias: 0.0005,
        }
    }
}

/// Reverse-Z orthographic view-projection of the light's shadow camera.
pub fn light_view_projection(light: &DirectionalLight, config: &ShadowMapConfig) -> Mat4 {
    let dir = light.direction();
    let up = if dir.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let view = Mat4::look_to_rh(light.position, dir, up);
    let e = config.half_extent;
    let proj = Mat4::orthographic_rh(-e, e, -e, e, config.far, config.near);
    proj * view
}

/// GPU-side shadow uniform, 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ShadowUniform {
    /// Light-space view-projection matrix.
    pub light_matrix: [f32; 16],
    /// x = texel size in UV, y = compare bias, zw = padding.
    pub params: [f32; 4],
}

impl ShadowUniform {
    /// Texel size from the resolution, bias from the config.
    pub fn new(light_matrix: Mat4, config: &ShadowMapConfig) -> Self {
        Self {
            light_matrix: light_matrix.to_cols_array(),
            params: [1.0 / config.resolution as f32, config.compare_bias, 0.0, 0.0],
        }
    }
}

/// Shadow map GPU resources.
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Comparison sampler (reverse-Z: `GreaterEqual`).
    pub sampler: wgpu::Sampler,
    pub light_matrix: Mat4,
    pub config: ShadowMapConfig,
}

impl ShadowMap {
    /// Reverse-Z, cleared to 0.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Allocate the depth texture and its comparison sampler.
    pub fn new(device: &wgpu::Device, config: &ShadowMapConfig) -> Self {
        let size = config.resolution.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow-map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-comparison-sampler"),
            compare: Some(wgpu::CompareFunction::GreaterEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            light_matrix: Mat4::IDENTITY,
            config: config.clone(),
        }
    }

    /// Recompute the light matrix for the current light placement.
    pub fn update(&mut self, light: &DirectionalLight) {
        self.light_matrix = light_view_projection(light, &self.config);
    }

    /// Uniform for the lit passes.
    pub fn to_uniform(&self) -> ShadowUniform {
        ShadowUniform::new(self.light_matrix, &self.config)
    }
}

/// CPU-side shadow depth buffer, filled by the reference rasterizer.
#[derive(Clone, Debug)]
pub struct ShadowDepthMap {
    pub size: u32,
    /// Row-major, top row first. Cleared to 0 (the far plane).
    pub depths: Vec<f32>,
    pub light_matrix: Mat4,
    pub compare_bias: f32,
}

impl ShadowDepthMap {
    /// Empty map, every texel at the far plane.
    pub fn new(light_matrix: Mat4, config: &ShadowMapConfig) -> Self {
        let size = config.resolution.max(1);
        Self {
            size,
            depths: vec![0.0; (size * size) as usize],
            light_matrix,
            compare_bias: config.compare_bias,
        }
    }

    /// Keep the nearer (larger) depth at a texel.
    pub fn write(&mut self, x: u32, y: u32, depth: f32) {
        if x < self.size && y < self.size {
            let i = (y * self.size + x) as usize;
            self.depths[i] = self.depths[i].max(depth);
        }
    }

    /// Depth at a texel, clamping out-of-range coordinates to the edge.
    pub fn read(&self, x: i64, y: i64) -> f32 {
        let max = self.size as i64 - 1;
        let x = x.clamp(0, max) as u32;
        let y = y.clamp(0, max) as u32;
        self.depths[(y * self.size + x) as usize]
    }

    /// Fraction of light reaching `world_pos`, 3x3 percentage-closer filtered.
    ///
    /// Points outside the shadow volume are fully lit.
    pub fn shadow_factor(&self, world_pos: Vec3) -> f32 {
        let clip = self.light_matrix * world_pos.extend(1.0);
        let coord = clip.truncate() / clip.w;
        let uv = Vec2::new(coord.x * 0.5 + 0.5, -coord.y * 0.5 + 0.5);
        if !(0.0..=1.0).contains(&uv.x)
            || !(0.0..=1.0).contains(&uv.y)
            || !(0.0..=1.0).contains(&coord.z)
        {
            return 1.0;
        }

        let reference = coord.z + self.compare_bias;
        let cx = (uv.x * self.size as f32).floor() as i64;
        let cy = (uv.y * self.size as f32).floor() as i64;
        let mut lit = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if reference >= self.read(cx + dx, cy + dy) {
                    lit += 1.0;
                }
            }
        }
        lit / 9.0
    }
}

/// WGSL for shadow lookup.
///
/// Expects `shadow_uniforms` (a `ShadowUniforms`), `shadow_map_texture`
/// (`texture_depth_2d`) and `shadow_sampler` (`sampler_comparison`) bindings.
pub const SHADOW_WGSL: &str = r#"
struct ShadowUniforms {
    light_matrix: mat4x4<f32>,
    params: vec4<f32>,
};

fn shadow_factor(world_pos: vec3<f32>) -> f32 {
    let light_pos = shadow_uniforms.light_matrix * vec4<f32>(world_pos, 1.0);
    let coord = light_pos.xyz / light_pos.w;
    let uv = vec2<f32>(coord.x * 0.5 + 0.5, -coord.y * 0.5 + 0.5);
    if uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0 || coord.z < 0.0 || coord.z > 1.0 {
        return 1.0;
    }

    let texel = shadow_uniforms.params.x;
    let reference = coord.z + shadow_uniforms.params.y;
    var lit = 0.0;
    for (var y = -1; y <= 1; y++) {
        for (var x = -1; x <= 1; x++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            lit += textureSampleCompareLevel(
                shadow_map_texture, shadow_sampler, uv + offset, reference
            );
        }
    }
    return lit / 9.0;
}
"#;
