//! Lit color and depth-only pipelines for every surface variant, plus the
//! per-object GPU state they draw.
//!
//! One mesh bind group per object serves both pipelines: it sits at
//! `COLOR_MESH_GROUP` in the color layout and `DEPTH_MESH_GROUP` in the
//! depth layout, and always carries the shading uniform so plain and
//! dissolve variants share a layout.

use std::num::NonZeroU64;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use ember_lighting::{
    DirectionalLightUniform, EnvironmentUniform, PbrMaterialUniform, ShadowMap, ShadowUniform,
};
use ember_materials::wgsl::{
    COLOR_MESH_GROUP, DEPTH_MESH_GROUP, SHADING_BINDING, color_shader_source, depth_shader_source,
};
use ember_materials::{ShadingParams, ShadingUniform, SurfaceVariant};
use ember_mesh::{MESH_VERTEX_LAYOUT, MeshData};
use glam::Mat4;

use crate::buffer::{BufferAllocator, GpuMesh};
use crate::camera::CameraUniform;
use crate::depth::depth_stencil_state;
use crate::frame::FrameError;
use crate::scene::SceneObject;
use crate::shader::ShaderLibrary;
use crate::target::HDR_FORMAT;
use crate::texture::EnvironmentMap;

/// Per-object transforms, 128 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}

impl MeshUniform {
    /// Model matrix plus the matrix used to transform normals.
    pub fn new(model: Mat4, normal_matrix: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
        }
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

/// Bind group layouts shared by every surface pipeline.
pub struct SurfaceLayouts {
    pub camera: wgpu::BindGroupLayout,
    pub lighting: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
    pub mesh: wgpu::BindGroupLayout,
}

impl SurfaceLayouts {
    /// Camera, lighting, shadow and per-object layouts.
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera-layout"),
            entries: &[uniform_entry(0, vertex_fragment, std::mem::size_of::<CameraUniform>())],
        });
        let fragment = wgpu::ShaderStages::FRAGMENT;
        let lighting = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lighting-layout"),
            entries: &[
                uniform_entry(0, fragment, std::mem::size_of::<DirectionalLightUniform>()),
                uniform_entry(1, fragment, std::mem::size_of::<EnvironmentUniform>()),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: fragment,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: fragment,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let shadow = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-layout"),
            entries: &[
                uniform_entry(0, fragment, std::mem::size_of::<ShadowUniform>()),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: fragment,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: fragment,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let mesh = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh-layout"),
            entries: &[
                uniform_entry(0, vertex_fragment, std::mem::size_of::<MeshUniform>()),
                uniform_entry(1, vertex_fragment, std::mem::size_of::<PbrMaterialUniform>()),
                uniform_entry(
                    SHADING_BINDING,
                    vertex_fragment,
                    std::mem::size_of::<ShadingUniform>(),
                ),
            ],
        });
        Self {
            camera,
            lighting,
            shadow,
            mesh,
        }
    }

    /// Bind a camera uniform buffer.
    pub fn camera_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    /// Bind the light, environment uniform and cube map.
    pub fn lighting_bind_group(
        &self,
        device: &wgpu::Device,
        sun: &wgpu::Buffer,
        environment: &wgpu::Buffer,
        environment_map: &EnvironmentMap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &self.lighting,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sun.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: environment.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&environment_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&environment_map.sampler),
                },
            ],
        })
    }

    /// Bind the shadow uniform, depth texture and comparison sampler.
    pub fn shadow_bind_group(
        &self,
        device: &wgpu::Device,
        uniform: &wgpu::Buffer,
        map: &ShadowMap,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-bind-group"),
            layout: &self.shadow,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&map.sampler),
                },
            ],
        })
    }
}

/// Culling for one pipeline: front faces are culled in the depth pass so
/// the shadow map stores back faces of closed meshes.
fn cull_mode(double_sided: bool, depth_only: bool) -> Option<wgpu::Face> {
    match (double_sided, depth_only) {
        (true, _) => None,
        (false, false) => Some(wgpu::Face::Back),
        (false, true) => Some(wgpu::Face::Front),
    }
}

fn pipeline_index(variant: SurfaceVariant, double_sided: bool) -> usize {
    let v = match variant {
        SurfaceVariant::Plain => 0,
        SurfaceVariant::Dissolve => 2,
    };
    v + usize::from(double_sided)
}

/// Color and depth pipelines keyed by variant and sidedness.
pub struct SurfacePipelines {
    pub layouts: SurfaceLayouts,
    color: Vec<wgpu::RenderPipeline>,
    depth: Vec<wgpu::RenderPipeline>,
}

impl SurfacePipelines {
    /// Compile both variants and build their color and depth pipelines.
    pub fn new(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        shadow_bias: wgpu::DepthBiasState,
    ) -> Result<Self, FrameError> {
        debug_assert_eq!(COLOR_MESH_GROUP, 3);
        debug_assert_eq!(DEPTH_MESH_GROUP, 1);
        let layouts = SurfaceLayouts::new(device);
        let color_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface-color-layout"),
            bind_group_layouts: &[
                &layouts.camera,
                &layouts.lighting,
                &layouts.shadow,
                &layouts.mesh,
            ],
            immediate_size: 0,
        });
        let depth_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface-depth-layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.mesh],
            immediate_size: 0,
        });

        let mut color = Vec::with_capacity(4);
        let mut depth = Vec::with_capacity(4);
        for variant in [SurfaceVariant::Plain, SurfaceVariant::Dissolve] {
            let color_label = format!("surface-color-{}", variant.label());
            let depth_label = format!("surface-depth-{}", variant.label());
            let color_module =
                library.compile(device, &color_label, &color_shader_source(variant)?)?;
            let depth_module =
                library.compile(device, &depth_label, &depth_shader_source(variant)?)?;
            for double_sided in [false, true] {
                color.push(surface_pipeline(
                    device,
                    &color_label,
                    &color_layout,
                    &color_module,
                    ("vs_main", "fs_main"),
                    cull_mode(double_sided, false),
                    wgpu::DepthBiasState::default(),
                    false,
                ));
                depth.push(surface_pipeline(
                    device,
                    &depth_label,
                    &depth_layout,
                    &depth_module,
                    ("vs_depth", "fs_depth"),
                    cull_mode(double_sided, true),
                    shadow_bias,
                    true,
                ));
            }
        }
        log::info!("Created {} surface pipelines", color.len() + depth.len());
        Ok(Self {
            layouts,
            color,
            depth,
        })
    }

    /// Lit pipeline for a variant and sidedness.
    pub fn color(&self, variant: SurfaceVariant, double_sided: bool) -> &wgpu::RenderPipeline {
        &self.color[pipeline_index(variant, double_sided)]
    }

    /// Depth-only pipeline used for shadow casting.
    pub fn depth(&self, variant: SurfaceVariant, double_sided: bool) -> &wgpu::RenderPipeline {
        &self.depth[pipeline_index(variant, double_sided)]
    }
}

#[allow(clippy::too_many_arguments)]
fn surface_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vertex_entry, fragment_entry): (&str, &str),
    cull_mode: Option<wgpu::Face>,
    bias: wgpu::DepthBiasState,
    depth_only: bool,
) -> wgpu::RenderPipeline {
    let color_targets = [Some(wgpu::ColorTargetState {
        format: HDR_FORMAT,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vertex_entry),
            buffers: &[MESH_VERTEX_LAYOUT],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(depth_stencil_state(bias)),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: if depth_only {
                &[] as &[Option<wgpu::ColorTargetState>]
            } else {
                &color_targets
            },
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

/// GPU state of one scene object.
pub struct GpuObject {
    pub mesh: GpuMesh,
    source_mesh: Arc<MeshData>,
    mesh_uniform: wgpu::Buffer,
    material: wgpu::Buffer,
    shading: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub variant: SurfaceVariant,
    pub double_sided: bool,
}

impl GpuObject {
    /// Upload an object's mesh and uniforms.
    pub fn new(device: &wgpu::Device, layouts: &SurfaceLayouts, object: &SceneObject) -> Self {
        let allocator = BufferAllocator::new(device);
        let mesh_uniform = allocator.create_uniform_buffer(
            &format!("{}-mesh-uniform", object.label),
            &MeshUniform::new(object.transform, object.normal_matrix()),
        );
        let material = allocator.create_uniform_buffer(
            &format!("{}-material", object.label),
            &object.material.to_uniform(),
        );
        let shading = allocator.create_uniform_buffer(
            &format!("{}-shading", object.label),
            &shading_uniform(object),
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&object.label),
            layout: &layouts.mesh,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: mesh_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: material.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: SHADING_BINDING,
                    resource: shading.as_entire_binding(),
                },
            ],
        });
        log::debug!("Uploaded '{}' ({} triangles)", object.label, object.mesh.triangle_count());
        Self {
            mesh: GpuMesh::upload(device, &object.label, &object.mesh),
            source_mesh: object.mesh.clone(),
            mesh_uniform,
            material,
            shading,
            bind_group,
            variant: object.variant(),
            double_sided: object.double_sided,
        }
    }

    /// Whether this GPU state was built from the object's current mesh and variant.
    pub fn matches(&self, object: &SceneObject) -> bool {
        Arc::ptr_eq(&self.source_mesh, &object.mesh) && self.variant == object.variant()
    }

    /// Upload this frame's snapshot of transform, material and shading.
    pub fn write(&mut self, queue: &wgpu::Queue, object: &SceneObject) {
        self.double_sided = object.double_sided;
        queue.write_buffer(
            &self.mesh_uniform,
            0,
            bytemuck::bytes_of(&MeshUniform::new(object.transform, object.normal_matrix())),
        );
        queue.write_buffer(&self.material, 0, bytemuck::bytes_of(&object.material.to_uniform()));
        queue.write_buffer(&self.shading, 0, bytemuck::bytes_of(&shading_uniform(object)));
    }
}

fn shading_uniform(object: &SceneObject) -> ShadingUniform {
    object
        .shading_snapshot()
        .unwrap_or_else(ShadingParams::default)
        .to_uniform()
}
