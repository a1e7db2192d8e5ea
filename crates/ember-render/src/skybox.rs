//! Environment cube drawn as the base pass background.
//!
//! The sky sits on the default layer only, so the bloom pass never sees it.
//! It is drawn first with depth writes off; objects then cover it.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::depth::DepthBuffer;
use crate::frame::FrameError;
use crate::layers::Layers;
use crate::shader::ShaderLibrary;
use crate::target::HDR_FORMAT;
use crate::texture::{CubeFaces, EnvironmentMap};

/// Cube faces shown behind the scene and the layers that draw them.
#[derive(Clone, Debug)]
pub struct Skybox {
    pub faces: Arc<CubeFaces>,
    pub layers: Layers,
}

impl Skybox {
    /// Background on the default layer.
    pub fn new(faces: Arc<CubeFaces>) -> Self {
        Self {
            faces,
            layers: Layers::default(),
        }
    }

    /// Whether a camera with `camera_mask` draws the sky.
    pub fn is_visible(&self, camera_mask: Layers) -> bool {
        self.layers.test(camera_mask)
    }
}

/// World-space view ray through an NDC point.
pub fn view_direction(inv_view_proj: Mat4, camera_position: Vec3, ndc: Vec2) -> Vec3 {
    let world = inv_view_proj.project_point3(ndc.extend(0.5));
    (world - camera_position).normalize_or_zero()
}

/// Inverse view-projection and eye position, 80 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SkyboxUniform {
    pub inv_view_proj: [f32; 16],
    pub camera_position: [f32; 4],
}

impl SkyboxUniform {
    /// Inverse view-projection and eye of `camera`.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        Self {
            inv_view_proj: camera.view_projection_matrix().inverse().to_cols_array(),
            camera_position: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Fullscreen triangle at the far plane that samples the cube per pixel.
pub const SKYBOX_WGSL: &str = r#"
struct SkyboxUniform {
    inv_view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
};

@group(0) @binding(0) var<uniform> sky: SkyboxUniform;
@group(0) @binding(1) var sky_texture: texture_cube<f32>;
@group(0) @binding(2) var sky_sampler: sampler;

struct SkyOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_sky(@builtin(vertex_index) idx: u32) -> SkyOut {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    let ndc = uv * 2.0 - 1.0;
    var out: SkyOut;
    out.clip = vec4<f32>(ndc, 0.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_sky(in: SkyOut) -> @location(0) vec4<f32> {
    let world = sky.inv_view_proj * vec4<f32>(in.ndc, 0.5, 1.0);
    let dir = normalize(world.xyz / world.w - sky.camera_position.xyz);
    return vec4<f32>(textureSample(sky_texture, sky_sampler, dir).rgb, 1.0);
}
"#;

/// Skybox pipeline and the bind group pointing at the current cube.
pub struct SkyboxStage {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl SkyboxStage {
    /// Build the pipeline and bind the given cube.
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        environment: &EnvironmentMap,
    ) -> Result<Self, FrameError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("skybox-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("skybox-pipeline-layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let module = library.compile(device, "skybox", SKYBOX_WGSL)?;
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("skybox-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_sky"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Shares the lit pass depth attachment without touching it.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_sky"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let uniform = crate::buffer::BufferAllocator::new(device).create_uniform_buffer(
            "skybox-uniform",
            &SkyboxUniform::new(&PerspectiveCamera::default()),
        );
        let bind_group = Self::bind(device, &layout, &uniform, environment);
        Ok(Self {
            layout,
            pipeline,
            uniform,
            bind_group,
        })
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform: &wgpu::Buffer,
        environment: &EnvironmentMap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("skybox-bind-group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&environment.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&environment.sampler),
                },
            ],
        })
    }

    /// Point the skybox at a newly uploaded cube.
    pub fn rebind(&mut self, device: &wgpu::Device, environment: &EnvironmentMap) {
        self.bind_group = Self::bind(device, &self.layout, &self.uniform, environment);
    }

    /// Upload the camera for this frame.
    pub fn write(&self, queue: &wgpu::Queue, camera: &PerspectiveCamera) {
        queue.write_buffer(&self.uniform, 0, bytemuck::bytes_of(&SkyboxUniform::new(camera)));
    }

    /// One fullscreen triangle. Must run before the lit draws of the pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
