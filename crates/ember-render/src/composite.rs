//! Final composite: base + glow, exposure, tone mapping, sRGB encoding.

use bytemuck::{Pod, Zeroable};
use ember_config::ToneMappingMode;
use glam::Vec3;

use crate::bloom::fullscreen_pipeline_with_format;
use crate::frame::FrameError;
use crate::shader::ShaderLibrary;
use crate::target::FrameTargets;

/// Tone mapping curve applied after exposure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    /// Clamp to [0, 1].
    Linear,
    Reinhard,
    /// Hejl/Burgess-Dawson filmic fit; its output is already gamma encoded
    /// and is decoded back to linear before the final encode.
    #[default]
    Cineon,
    /// Narkowicz ACES fit.
    AcesFilmic,
}

impl ToneMapping {
    /// Index used by the composite shader's `switch`.
    pub fn shader_index(self) -> u32 {
        match self {
            ToneMapping::None => 0,
            ToneMapping::Linear => 1,
            ToneMapping::Reinhard => 2,
            ToneMapping::Cineon => 3,
            ToneMapping::AcesFilmic => 4,
        }
    }

    /// Map linear HDR color to display range.
    pub fn apply(self, color: Vec3) -> Vec3 {
        match self {
            ToneMapping::None => color,
            ToneMapping::Linear => color.clamp(Vec3::ZERO, Vec3::ONE),
            ToneMapping::Reinhard => (color / (Vec3::ONE + color)).clamp(Vec3::ZERO, Vec3::ONE),
            ToneMapping::Cineon => {
                let c = (color - Vec3::splat(0.004)).max(Vec3::ZERO);
                let mapped = (c * (6.2 * c + Vec3::splat(0.5)))
                    / (c * (6.2 * c + Vec3::splat(1.7)) + Vec3::splat(0.06));
                mapped.powf(2.2)
            }
            ToneMapping::AcesFilmic => {
                let c = color;
                let mapped = (c * (2.51 * c + Vec3::splat(0.03)))
                    / (c * (2.43 * c + Vec3::splat(0.59)) + Vec3::splat(0.14));
                mapped.clamp(Vec3::ZERO, Vec3::ONE)
            }
        }
    }
}

impl From<ToneMappingMode> for ToneMapping {
    fn from(mode: ToneMappingMode) -> Self {
        match mode {
            ToneMappingMode::None => ToneMapping::None,
            ToneMappingMode::Linear => ToneMapping::Linear,
            ToneMappingMode::Reinhard => ToneMapping::Reinhard,
            ToneMappingMode::Cineon => ToneMapping::Cineon,
            ToneMappingMode::AcesFilmic => ToneMapping::AcesFilmic,
        }
    }
}

/// Linear to sRGB transfer for one channel.
pub fn srgb_encode_channel(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// [`srgb_encode_channel`] per component.
pub fn srgb_encode(color: Vec3) -> Vec3 {
    Vec3::new(
        srgb_encode_channel(color.x),
        srgb_encode_channel(color.y),
        srgb_encode_channel(color.z),
    )
}

/// Composite one pixel. Glow is added before tone mapping.
pub fn composite_pixel(
    base: Vec3,
    glow: Vec3,
    exposure: f32,
    tone_mapping: ToneMapping,
    encode_srgb: bool,
) -> Vec3 {
    let mapped = tone_mapping.apply((base + glow) * exposure);
    if encode_srgb {
        srgb_encode(mapped)
    } else {
        mapped
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CompositeUniform {
    pub exposure: f32,
    pub tone_mapping: u32,
    pub encode_srgb: u32,
    pub _pad: u32,
}

impl CompositeUniform {
    /// Composite parameters packed for the GPU.
    pub fn new(exposure: f32, tone_mapping: ToneMapping, encode_srgb: bool) -> Self {
        Self {
            exposure,
            tone_mapping: tone_mapping.shader_index(),
            encode_srgb: encode_srgb as u32,
            _pad: 0,
        }
    }
}

/// Fullscreen composite: base plus glow, exposure, tone mapping.
pub const COMPOSITE_SHADER_SOURCE: &str = r#"
struct CompositeUniform {
    exposure: f32,
    tone_mapping: u32,
    encode_srgb: u32,
    _pad: u32,
};

@group(0) @binding(0) var<uniform> params: CompositeUniform;
@group(0) @binding(1) var base_tex: texture_2d<f32>;
@group(0) @binding(2) var glow_tex: texture_2d<f32>;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}

fn tone_map(color: vec3<f32>) -> vec3<f32> {
    switch params.tone_mapping {
        case 1u: {
            return clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
        }
        case 2u: {
            return clamp(color / (vec3<f32>(1.0) + color), vec3<f32>(0.0), vec3<f32>(1.0));
        }
        case 3u: {
            let c = max(vec3<f32>(0.0), color - 0.004);
            return pow((c * (6.2 * c + 0.5)) / (c * (6.2 * c + 1.7) + 0.06), vec3<f32>(2.2));
        }
        case 4u: {
            let c = color;
            let mapped = (c * (2.51 * c + 0.03)) / (c * (2.43 * c + 0.59) + 0.14);
            return clamp(mapped, vec3<f32>(0.0), vec3<f32>(1.0));
        }
        default: {
            return color;
        }
    }
}

fn srgb_encode(color: vec3<f32>) -> vec3<f32> {
    let c = clamp(color, vec3<f32>(0.0), vec3<f32>(1.0));
    let low = c * 12.92;
    let high = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3<f32>(0.0031308));
}

@fragment
fn fs_composite(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let pixel = vec2<i32>(frag.xy);
    let base = textureLoad(base_tex, pixel, 0).rgb;
    let glow = textureLoad(glow_tex, pixel, 0).rgb;
    var color = tone_map((base + glow) * params.exposure);
    if params.encode_srgb != 0u {
        color = srgb_encode(color);
    }
    return vec4<f32>(color, 1.0);
}
"#;

/// Writes the final image into the surface texture.
pub struct CompositeStage {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    params: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
}

impl CompositeStage {
    /// Build the composite pipeline for the surface format.
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, FrameError> {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CompositeUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite-pipeline-layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let module = library.compile(device, "composite", COMPOSITE_SHADER_SOURCE)?;
        let pipeline = fullscreen_pipeline_with_format(
            device,
            "composite-pipeline",
            &pipeline_layout,
            &module,
            "fs_composite",
            None,
            surface_format,
        );
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite-params"),
            size: std::mem::size_of::<CompositeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            layout,
            pipeline,
            params,
            bind_group: None,
        })
    }

    /// Point the composite at a freshly built set of targets.
    pub fn resize(&mut self, device: &wgpu::Device, targets: &FrameTargets) {
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite-bind-group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.base.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.glow.view),
                },
            ],
        }));
    }

    /// Upload new exposure and tone mapping values.
    pub fn write_params(&self, queue: &wgpu::Queue, uniform: CompositeUniform) {
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&uniform));
    }

    /// Record the composite pass into `output`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
    ) -> Result<(), FrameError> {
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or(FrameError::Unconfigured { stage: "composite" })?;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn test_composite_uniform_size() {
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 16);
    }

    #[test]
    fn test_black_stays_black_for_every_curve() {
        for mode in [
            ToneMapping::None,
            ToneMapping::Linear,
            ToneMapping::Reinhard,
            ToneMapping::Cineon,
            ToneMapping::AcesFilmic,
        ] {
            let out = composite_pixel(Vec3::ZERO, Vec3::ZERO, 0.1, mode, true);
            assert!(close(out, Vec3::ZERO), "{mode:?}: {out:?}");
        }
    }

    #[test]
    fn test_glow_added_before_tone_mapping() {
        let base = Vec3::splat(2.0);
        let glow = Vec3::splat(3.0);
        let summed = composite_pixel(base, glow, 1.0, ToneMapping::Reinhard, false);
        let separate = ToneMapping::Reinhard.apply(base) + ToneMapping::Reinhard.apply(glow);
        assert!(close(summed, Vec3::splat(5.0 / 6.0)), "{summed:?}");
        assert!(!close(summed, separate));
    }

    #[test]
    fn test_curves_are_bounded_and_monotonic() {
        for mode in [ToneMapping::Reinhard, ToneMapping::Cineon, ToneMapping::AcesFilmic] {
            let mut previous = -1.0;
            for step in 0..100 {
                let x = step as f32 * 0.5;
                let y = mode.apply(Vec3::splat(x)).x;
                assert!(y >= previous, "{mode:?} not monotonic at {x}");
                assert!(y <= 1.0 + 1e-4, "{mode:?} exceeds 1 at {x}: {y}");
                previous = y;
            }
        }
    }

    #[test]
    fn test_linear_clamps_and_none_passes_through() {
        assert_eq!(ToneMapping::Linear.apply(Vec3::splat(4.0)), Vec3::ONE);
        assert_eq!(ToneMapping::None.apply(Vec3::splat(4.0)), Vec3::splat(4.0));
    }

    #[test]
    fn test_srgb_encode_reference_points() {
        assert_eq!(srgb_encode_channel(0.0), 0.0);
        assert!((srgb_encode_channel(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_encode_channel(0.5) - 0.735_357).abs() < 1e-4);
        assert!((srgb_encode_channel(0.002) - 0.025_84).abs() < 1e-5);
    }

    #[test]
    fn test_skip_encode_for_srgb_surface() {
        let out = composite_pixel(Vec3::splat(0.5), Vec3::ZERO, 1.0, ToneMapping::Linear, false);
        assert_eq!(out, Vec3::splat(0.5));
    }

    #[test]
    fn test_mode_conversion_and_default() {
        assert_eq!(ToneMapping::default(), ToneMapping::Cineon);
        assert_eq!(ToneMapping::from(ToneMappingMode::AcesFilmic), ToneMapping::AcesFilmic);
        assert_eq!(ToneMapping::from(ToneMappingMode::None).shader_index(), 0);
    }
}
