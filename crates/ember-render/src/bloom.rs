//! Selective bloom: high-pass, multi-resolution Gaussian blur, accumulation.
//!
//! The bloom scene (bloom-layer objects only, lit normally) is high-passed on
//! luminance, blurred through a chain of half-resolution levels, and every
//! level is added into a full-resolution glow buffer with its own weight.
//! The math lives in free functions shared by the GPU stage and the CPU
//! reference.

use bytemuck::{Pod, Zeroable};
use ember_config::BloomSettings;
use glam::Vec3;

use crate::buffer::BufferAllocator;
use crate::frame::FrameError;
use crate::shader::ShaderLibrary;
use crate::target::{FrameTargets, HDR_FORMAT, MipChain, RenderTarget, TargetLayout};

/// Blur tap spacing in level texels per unit of `radius`.
pub const RADIUS_TEXEL_SCALE: f32 = 4.0;
/// Accumulation factors of the first levels; later levels continue the ramp.
pub const LEVEL_FACTORS: [f32; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];
/// Upper bound on taps per side, including the center.
pub const MAX_KERNEL_RADIUS: usize = 16;
/// Upper bound on blur levels.
pub const MAX_LEVELS: u32 = 8;
/// Rec. 709 luma weights.
pub const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

#[derive(Clone, Debug, PartialEq)]
pub struct BloomConfig {
    pub strength: f32,
    /// Blur spread in `[0, 1]`: widens tap spacing and shifts weight to wide levels.
    pub radius: f32,
    /// Luma below which nothing blooms.
    pub threshold: f32,
    /// Width of the smooth ramp above `threshold`.
    pub soft_knee: f32,
    pub levels: u32,
    pub tint: Vec3,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            strength: 0.5,
            radius: 0.25,
            threshold: 0.2,
            soft_knee: 0.01,
            levels: 5,
            tint: Vec3::ONE,
        }
    }
}

impl From<&BloomSettings> for BloomConfig {
    fn from(settings: &BloomSettings) -> Self {
        Self {
            strength: settings.strength.max(0.0),
            radius: settings.radius.clamp(0.0, 1.0),
            threshold: settings.threshold,
            soft_knee: settings.soft_knee.max(0.0),
            levels: settings.levels.min(MAX_LEVELS),
            tint: Vec3::ONE,
        }
    }
}

impl BloomConfig {
    /// Distance between blur taps, in texels of the level being blurred.
    pub fn tap_spacing(&self) -> f32 {
        self.radius * RADIUS_TEXEL_SCALE
    }

    /// Weight of level `index` in the glow sum.
    pub fn level_weight(&self, index: usize) -> Vec3 {
        let f = level_factor(index);
        let mixed = f + (1.2 - 2.0 * f) * self.radius;
        self.tint * (mixed * self.strength)
    }

    /// How far glow can reach from a bright pixel, in full-resolution
    /// pixels per axis. Conservative: counts every tap and the bilinear
    /// footprint of each resample.
    pub fn footprint(&self) -> f32 {
        let mut reach = 0.0;
        let mut source_texel = 1.0;
        let mut level_texel = 1.0;
        for level in 0..self.levels as usize {
            level_texel = (1u64 << (level + 1)) as f32;
            let taps = (kernel_radius(level) - 1) as f32;
            reach += taps * self.tap_spacing() * level_texel + source_texel;
            source_texel = level_texel;
        }
        reach + level_texel
    }
}

/// Taps per side (center included) at `level`.
pub fn kernel_radius(level: usize) -> usize {
    (3 + 2 * level).min(MAX_KERNEL_RADIUS)
}

/// Accumulation weight of a level before radius mixing.
pub fn level_factor(index: usize) -> f32 {
    LEVEL_FACTORS
        .get(index)
        .copied()
        .unwrap_or_else(|| (1.0 - 0.2 * index as f32).max(0.0))
}

/// One-sided Gaussian weights, `sigma = kernel_radius`, normalized so the
/// full symmetric kernel sums to 1.
pub fn gaussian_weights(kernel_radius: usize) -> Vec<f32> {
    let sigma = kernel_radius as f32;
    let raw: Vec<f32> = (0..kernel_radius)
        .map(|k| (-0.5 * (k * k) as f32 / (sigma * sigma)).exp())
        .collect();
    let total = raw[0] + 2.0 * raw[1..].iter().sum::<f32>();
    raw.into_iter().map(|w| w / total).collect()
}

/// Rec. 709 luminance.
pub fn luma(color: Vec3) -> f32 {
    color.dot(LUMA)
}

/// Hermite step; a degenerate edge acts as a hard step at `edge0`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Keep the part of `color` above the luminance threshold.
pub fn high_pass(color: Vec3, config: &BloomConfig) -> Vec3 {
    let alpha = smoothstep(config.threshold, config.threshold + config.soft_knee, luma(color));
    color * alpha
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct HighPassParams {
    pub threshold: f32,
    pub soft_knee: f32,
    pub _pad: [f32; 2],
}

/// One directional blur pass, 96 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BlurParams {
    pub direction: [f32; 2],
    /// Texel size of the destination level.
    pub texel: [f32; 2],
    pub spacing: f32,
    pub taps: u32,
    pub _pad: [u32; 2],
    pub weights: [[f32; 4]; MAX_KERNEL_RADIUS / 4],
}

impl BlurParams {
    /// Weights and tap direction of one blur pass.
    pub fn new(
        config: &BloomConfig,
        layout: &TargetLayout,
        level: usize,
        horizontal: bool,
    ) -> Self {
        let radius = kernel_radius(level);
        let mut weights = [[0.0; 4]; MAX_KERNEL_RADIUS / 4];
        for (k, w) in gaussian_weights(radius).into_iter().enumerate() {
            weights[k / 4][k % 4] = w;
        }
        let texel = layout.level(level).map_or([1.0, 1.0], |s| s.texel());
        Self {
            direction: if horizontal { [1.0, 0.0] } else { [0.0, 1.0] },
            texel,
            spacing: config.tap_spacing(),
            taps: radius as u32,
            _pad: [0; 2],
            weights,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct AccumulateParams {
    /// rgb = level weight.
    pub weight: [f32; 4],
    /// Texel size of the glow buffer.
    pub texel: [f32; 2],
    pub _pad: [f32; 2],
}

const FULLSCREEN_WGSL: &str = r#"
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}
"#;

const HIGH_PASS_WGSL: &str = r#"
struct HighPassParams {
    threshold: f32,
    soft_knee: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: HighPassParams;

@fragment
fn fs_high_pass(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let color = textureLoad(input_tex, vec2<i32>(frag.xy), 0).rgb;
    let luma = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    let alpha = smoothstep(params.threshold, params.threshold + params.soft_knee, luma);
    return vec4<f32>(color * alpha, 1.0);
}
"#;

const BLUR_WGSL: &str = r#"
struct BlurParams {
    direction: vec2<f32>,
    texel: vec2<f32>,
    spacing: f32,
    taps: u32,
    _pad: vec2<u32>,
    weights: array<vec4<f32>, 4>,
};

@group(0) @binding(0) var<uniform> params: BlurParams;

fn tap_weight(k: u32) -> f32 {
    return params.weights[k / 4u][k % 4u];
}

@fragment
fn fs_blur(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = frag.xy * params.texel;
    let stride = params.direction * params.texel * params.spacing;
    var sum = textureSampleLevel(input_tex, input_sampler, uv, 0.0).rgb * tap_weight(0u);
    for (var k = 1u; k < params.taps; k++) {
        let offset = stride * f32(k);
        let w = tap_weight(k);
        sum += textureSampleLevel(input_tex, input_sampler, uv + offset, 0.0).rgb * w;
        sum += textureSampleLevel(input_tex, input_sampler, uv - offset, 0.0).rgb * w;
    }
    return vec4<f32>(sum, 1.0);
}
"#;

const ACCUMULATE_WGSL: &str = r#"
struct AccumulateParams {
    weight: vec4<f32>,
    texel: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: AccumulateParams;

@fragment
fn fs_accumulate(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let uv = frag.xy * params.texel;
    let color = textureSampleLevel(input_tex, input_sampler, uv, 0.0).rgb;
    return vec4<f32>(color * params.weight.rgb, 1.0);
}
"#;

/// Fullscreen vertex stage plus the soft-knee threshold.
pub fn high_pass_shader_source() -> String {
    format!("{FULLSCREEN_WGSL}{HIGH_PASS_WGSL}")
}

/// Fullscreen vertex stage plus the separable Gaussian.
pub fn blur_shader_source() -> String {
    format!("{FULLSCREEN_WGSL}{BLUR_WGSL}")
}

/// Fullscreen vertex stage plus the weighted additive blend.
pub fn accumulate_shader_source() -> String {
    format!("{FULLSCREEN_WGSL}{ACCUMULATE_WGSL}")
}

fn uniform_buffer<T: Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    BufferAllocator::new(device).create_uniform_buffer(label, value)
}

/// Per-level uniform buffers and their bind groups.
struct LevelParams {
    horizontal: (wgpu::Buffer, wgpu::BindGroup),
    vertical: (wgpu::Buffer, wgpu::BindGroup),
    accumulate: (wgpu::Buffer, wgpu::BindGroup),
}

/// Resources that depend on the viewport size.
struct SizedResources {
    layout: TargetLayout,
    mips: MipChain,
    bloom_scene_input: wgpu::BindGroup,
    bright_input: wgpu::BindGroup,
    horizontal_inputs: Vec<wgpu::BindGroup>,
    vertical_inputs: Vec<wgpu::BindGroup>,
    levels: Vec<LevelParams>,
}

/// The bloom passes on the GPU.
pub struct BloomStage {
    pub config: BloomConfig,
    params_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    accumulate_pipeline: wgpu::RenderPipeline,
    sampler: wgpu::Sampler,
    high_pass_buffer: wgpu::Buffer,
    high_pass_params: wgpu::BindGroup,
    sized: Option<SizedResources>,
}

impl BloomStage {
    /// Compile the bloom shaders. Size-dependent resources are created on
    /// the first [`resize`](Self::resize).
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        config: BloomConfig,
    ) -> Result<Self, FrameError> {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-params-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-input-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-pipeline-layout"),
            bind_group_layouts: &[&params_layout, &texture_layout],
            immediate_size: 0,
        });

        let high_pass_module =
            library.compile(device, "bloom-high-pass", &high_pass_shader_source())?;
        let blur_module = library.compile(device, "bloom-blur", &blur_shader_source())?;
        let accumulate_module =
            library.compile(device, "bloom-accumulate", &accumulate_shader_source())?;

        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::REPLACE,
        };
        let high_pass_pipeline = fullscreen_pipeline(
            device,
            "bloom-high-pass-pipeline",
            &pipeline_layout,
            &high_pass_module,
            "fs_high_pass",
            None,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "bloom-blur-pipeline",
            &pipeline_layout,
            &blur_module,
            "fs_blur",
            None,
        );
        let accumulate_pipeline = fullscreen_pipeline(
            device,
            "bloom-accumulate-pipeline",
            &pipeline_layout,
            &accumulate_module,
            "fs_accumulate",
            Some(additive),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let high_pass_buffer = uniform_buffer(
            device,
            "bloom-high-pass-params",
            &HighPassParams {
                threshold: config.threshold,
                soft_knee: config.soft_knee,
                _pad: [0.0; 2],
            },
        );
        let high_pass_params = params_bind_group(device, &params_layout, &high_pass_buffer);

        Ok(Self {
            config,
            params_layout,
            texture_layout,
            high_pass_pipeline,
            blur_pipeline,
            accumulate_pipeline,
            sampler,
            high_pass_buffer,
            high_pass_params,
            sized: None,
        })
    }

    fn input(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Rebuild the blur chain and every bind group that points at a target.
    pub fn resize(&mut self, device: &wgpu::Device, targets: &FrameTargets) {
        let layout = targets.layout.clone();
        let mips = MipChain::new(device, &layout);
        let bloom_scene_input = self.input(device, "bloom-scene-input", &targets.bloom_scene.view);
        let bright_input = self.input(device, "bloom-bright-input", &targets.bright.view);
        let horizontal_inputs = mips
            .horizontal
            .iter()
            .map(|t| self.input(device, "bloom-horizontal-input", &t.view))
            .collect();
        let vertical_inputs = mips
            .vertical
            .iter()
            .map(|t| self.input(device, "bloom-vertical-input", &t.view))
            .collect();

        let levels = (0..layout.level_count())
            .map(|level| {
                let with_group = |buffer: wgpu::Buffer| {
                    let group = params_bind_group(device, &self.params_layout, &buffer);
                    (buffer, group)
                };
                LevelParams {
                    horizontal: with_group(
                        uniform_buffer(
                            device,
                            "bloom-blur-h-params",
                            &BlurParams::new(&self.config, &layout, level, true),
                        ),
                    ),
                    vertical: with_group(
                        uniform_buffer(
                            device,
                            "bloom-blur-v-params",
                            &BlurParams::new(&self.config, &layout, level, false),
                        ),
                    ),
                    accumulate: with_group(
                        uniform_buffer(
                            device,
                            "bloom-accumulate-params",
                            &self.accumulate_params(&layout, level),
                        ),
                    ),
                }
            })
            .collect();

        self.sized = Some(SizedResources {
            layout,
            mips,
            bloom_scene_input,
            bright_input,
            horizontal_inputs,
            vertical_inputs,
            levels,
        });
    }

    fn accumulate_params(&self, layout: &TargetLayout, level: usize) -> AccumulateParams {
        let w = self.config.level_weight(level);
        AccumulateParams {
            weight: [w.x, w.y, w.z, 0.0],
            texel: layout.viewport.texel(),
            _pad: [0.0; 2],
        }
    }

    /// Upload the current config. Level count is fixed by the target layout.
    pub fn write_params(&self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.high_pass_buffer,
            0,
            bytemuck::bytes_of(&HighPassParams {
                threshold: self.config.threshold,
                soft_knee: self.config.soft_knee,
                _pad: [0.0; 2],
            }),
        );
        let Some(sized) = &self.sized else {
            return;
        };
        for (level, params) in sized.levels.iter().enumerate() {
            let h = BlurParams::new(&self.config, &sized.layout, level, true);
            let v = BlurParams::new(&self.config, &sized.layout, level, false);
            queue.write_buffer(&params.horizontal.0, 0, bytemuck::bytes_of(&h));
            queue.write_buffer(&params.vertical.0, 0, bytemuck::bytes_of(&v));
            let acc = self.accumulate_params(&sized.layout, level);
            queue.write_buffer(&params.accumulate.0, 0, bytemuck::bytes_of(&acc));
        }
    }

    fn sized(&self) -> Result<&SizedResources, FrameError> {
        self.sized
            .as_ref()
            .ok_or(FrameError::Unconfigured { stage: "bloom" })
    }

    /// bloom_scene -> bright
    pub fn encode_high_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
    ) -> Result<(), FrameError> {
        let sized = self.sized()?;
        fullscreen_pass(
            encoder,
            "bloom-high-pass",
            &targets.bright,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            Some((&self.high_pass_pipeline, &self.high_pass_params, &sized.bloom_scene_input)),
        );
        Ok(())
    }

    /// Separable blur of one level. Level 0 reads the bright image, later
    /// levels read the previous level's vertical result.
    pub fn encode_blur(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        level: usize,
    ) -> Result<(), FrameError> {
        let sized = self.sized()?;
        let Some(params) = sized.levels.get(level) else {
            return Ok(());
        };
        let source = if level == 0 {
            &sized.bright_input
        } else {
            &sized.vertical_inputs[level - 1]
        };
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        fullscreen_pass(
            encoder,
            "bloom-blur-h",
            &sized.mips.horizontal[level],
            clear,
            Some((&self.blur_pipeline, &params.horizontal.1, source)),
        );
        fullscreen_pass(
            encoder,
            "bloom-blur-v",
            &sized.mips.vertical[level],
            clear,
            Some((&self.blur_pipeline, &params.vertical.1, &sized.horizontal_inputs[level])),
        );
        Ok(())
    }

    /// Clear the glow buffer and add every level into it.
    pub fn encode_accumulate(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
    ) -> Result<(), FrameError> {
        let sized = self.sized()?;
        fullscreen_pass(
            encoder,
            "bloom-glow-clear",
            &targets.glow,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            None,
        );
        for (level, params) in sized.levels.iter().enumerate() {
            fullscreen_pass(
                encoder,
                "bloom-accumulate",
                &targets.glow,
                wgpu::LoadOp::Load,
                Some((
                    &self.accumulate_pipeline,
                    &params.accumulate.1,
                    &sized.vertical_inputs[level],
                )),
            );
        }
        Ok(())
    }
}

fn params_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom-params"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    fullscreen_pipeline_with_format(
        device,
        label,
        layout,
        module,
        fragment_entry,
        blend,
        HDR_FORMAT,
    )
}

pub(crate) fn fullscreen_pipeline_with_format(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    blend: Option<wgpu::BlendState>,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

/// One fullscreen triangle into `target`; `None` only applies the load op.
fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &RenderTarget,
    load: wgpu::LoadOp<wgpu::Color>,
    draw: Option<(&wgpu::RenderPipeline, &wgpu::BindGroup, &wgpu::BindGroup)>,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(target.attachment(load))],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    if let Some((pipeline, params, input)) = draw {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, params, &[]);
        pass.set_bind_group(1, input, &[]);
        pass.draw(0..3, 0..1);
    }
}
