//! The GPU frame pipeline: owns every render target and stage, applies
//! deferred resizes, and runs the frame schedule.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bloom::BloomStage;
use crate::buffer::BufferAllocator;
use crate::composite::CompositeStage;
use crate::frame::{FrameClock, FrameError, FrameSchedule, PassKind, PipelineState};
use crate::gpu::RenderContext;
use crate::layers::{BLOOM_LAYER, Layers};
use crate::orbit::OrbitController;
use crate::pass::{LitBindings, begin_lit_pass, clear_color, draw_lit};
use crate::scene::{ObjectId, Scene};
use crate::settings::RenderSettings;
use crate::shader::ShaderLibrary;
use crate::shadow::{ShadowStage, shadow_depth_bias};
use crate::skybox::SkyboxStage;
use crate::surface::{PhysicalSize, ResizeQueue};
use crate::surface_pipeline::{GpuObject, SurfacePipelines};
use crate::target::{FrameTargets, TargetLayout, TargetSize};
use crate::texture::{CubeFaces, EnvironmentMap};

/// Draw lists snapshotted at the start of a frame.
struct DrawLists {
    casters: Vec<ObjectId>,
    bloom: Vec<ObjectId>,
    base: Vec<ObjectId>,
    bloom_sky: bool,
    base_sky: bool,
}

impl DrawLists {
    fn snapshot(scene: &Scene) -> Self {
        Self {
            casters: scene
                .objects()
                .filter(|(_, object)| object.casts_shadow)
                .map(|(id, _)| id)
                .collect(),
            bloom: scene.visible(Layers::layer(BLOOM_LAYER)),
            base: scene.visible(Layers::default()),
            bloom_sky: scene
                .skybox
                .as_ref()
                .is_some_and(|sky| sky.is_visible(Layers::layer(BLOOM_LAYER))),
            base_sky: scene
                .skybox
                .as_ref()
                .is_some_and(|sky| sky.is_visible(Layers::default())),
        }
    }
}

/// GPU frame loop: owns every stage and the per-object resources.
pub struct FramePipeline {
    pub ctx: RenderContext,
    pub settings: RenderSettings,
    library: ShaderLibrary,
    pipelines: SurfacePipelines,
    shadow: ShadowStage,
    bloom: BloomStage,
    composite: CompositeStage,
    targets: FrameTargets,
    resize: ResizeQueue,
    schedule: FrameSchedule,
    state: PipelineState,
    clock: FrameClock,
    objects: HashMap<ObjectId, GpuObject>,
    camera_buffer: wgpu::Buffer,
    camera_group: wgpu::BindGroup,
    sun_buffer: wgpu::Buffer,
    environment_buffer: wgpu::Buffer,
    environment_map: EnvironmentMap,
    /// Faces currently in `environment_map`, `None` for the placeholder.
    uploaded_faces: Option<Arc<CubeFaces>>,
    skybox: SkyboxStage,
    lighting_group: wgpu::BindGroup,
}

impl FramePipeline {
    /// Compile every shader and build all targets. Any failure is fatal.
    pub fn new(ctx: RenderContext, settings: RenderSettings) -> Result<Self, FrameError> {
        let device = &ctx.device;
        let mut library = ShaderLibrary::new();
        let depth_bias = shadow_depth_bias(&settings.shadow);
        let pipelines = SurfacePipelines::new(device, &mut library, depth_bias)?;
        let shadow = ShadowStage::new(device, &pipelines.layouts, &settings.shadow);
        let mut bloom = BloomStage::new(device, &mut library, settings.bloom.clone())?;
        let mut composite = CompositeStage::new(device, &mut library, ctx.surface_format)?;

        let (width, height) = (ctx.surface_config.width, ctx.surface_config.height);
        let layout = TargetLayout::for_viewport(width, height, settings.bloom.levels);
        let targets = FrameTargets::new(device, &layout);
        bloom.resize(device, &targets);
        composite.resize(device, &targets);

        let allocator = BufferAllocator::new(device);
        let camera_buffer = allocator.create_uniform_buffer(
            "camera-uniform",
            &crate::camera::PerspectiveCamera::default().to_uniform(),
        );
        let camera_group = pipelines.layouts.camera_bind_group(device, "camera", &camera_buffer);
        let sun_buffer = allocator.create_uniform_buffer(
            "sun-uniform",
            &ember_lighting::DirectionalLight::default().to_uniform(),
        );
        let environment_buffer = allocator.create_uniform_buffer(
            "environment-uniform",
            &ember_lighting::EnvironmentLighting::default().to_uniform(),
        );
        let environment_map = EnvironmentMap::placeholder(device, &ctx.queue)?;
        let skybox = SkyboxStage::new(device, &mut library, &environment_map)?;
        let lighting_group = pipelines.layouts.lighting_bind_group(
            device,
            &sun_buffer,
            &environment_buffer,
            &environment_map,
        );

        let schedule = FrameSchedule::standard(layout.level_count());
        log::info!(
            "Frame pipeline ready: {} passes, {} shaders",
            schedule.len(),
            library.len()
        );
        Ok(Self {
            resize: ResizeQueue::new(width, height),
            ctx,
            settings,
            library,
            pipelines,
            shadow,
            bloom,
            composite,
            targets,
            schedule,
            state: PipelineState::Idle,
            clock: FrameClock::new(),
            objects: HashMap::new(),
            camera_buffer,
            camera_group,
            sun_buffer,
            environment_buffer,
            environment_map,
            uploaded_faces: None,
            skybox,
            lighting_group,
        })
    }

    /// Lifecycle state after the last frame.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Passes run by each frame.
    pub fn schedule(&self) -> &FrameSchedule {
        &self.schedule
    }

    /// Target sizes of the current viewport.
    pub fn layout(&self) -> &TargetLayout {
        &self.targets.layout
    }

    /// Number of compiled shader modules.
    pub fn shader_count(&self) -> usize {
        self.library.len()
    }

    /// Queue a viewport change; it is applied at the start of the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.resize.request(width, height);
    }

    /// Upload the scene's cube when it changed since the last frame.
    fn sync_environment(&mut self, scene: &Scene) -> Result<(), FrameError> {
        let Some(sky) = scene.skybox.as_ref() else {
            return Ok(());
        };
        if self
            .uploaded_faces
            .as_ref()
            .is_some_and(|faces| Arc::ptr_eq(faces, &sky.faces))
        {
            return Ok(());
        }
        let device = &self.ctx.device;
        self.environment_map = EnvironmentMap::new(device, &self.ctx.queue, &sky.faces)?;
        self.lighting_group = self.pipelines.layouts.lighting_bind_group(
            device,
            &self.sun_buffer,
            &self.environment_buffer,
            &self.environment_map,
        );
        self.skybox.rebind(device, &self.environment_map);
        self.uploaded_faces = Some(sky.faces.clone());
        Ok(())
    }

    fn apply_resize(&mut self, size: PhysicalSize, orbit: &mut OrbitController) {
        self.ctx.resize(size.width, size.height);
        let device = &self.ctx.device;
        let layout =
            TargetLayout::for_viewport(size.width, size.height, self.settings.bloom.levels);
        self.targets = FrameTargets::new(device, &layout);
        self.bloom.resize(device, &self.targets);
        self.composite.resize(device, &self.targets);
        orbit.set_aspect_ratio(size.width, size.height);
        log::info!("Applied resize to {}x{}", size.width, size.height);
    }

    /// Create, refresh or drop GPU state so it mirrors `scene`, then upload
    /// this frame's parameter snapshot of every object.
    fn sync_objects(&mut self, scene: &Scene) {
        let device = &self.ctx.device;
        self.objects.retain(|id, _| scene.get(*id).is_some());
        for (id, object) in scene.objects() {
            let stale = self.objects.get(&id).is_none_or(|gpu| !gpu.matches(object));
            if stale {
                self.objects.insert(id, GpuObject::new(device, &self.pipelines.layouts, object));
            }
            if let Some(gpu) = self.objects.get_mut(&id) {
                gpu.write(&self.ctx.queue, object);
            }
        }
    }

    fn write_frame_uniforms(&mut self, scene: &Scene, orbit: &OrbitController) {
        let queue = &self.ctx.queue;
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&orbit.camera.to_uniform()));
        queue.write_buffer(&self.sun_buffer, 0, bytemuck::bytes_of(&scene.light.to_uniform()));
        queue.write_buffer(
            &self.environment_buffer,
            0,
            bytemuck::bytes_of(&scene.environment.to_uniform()),
        );
        self.shadow.write(queue, &scene.light);
        self.skybox.write(queue, &orbit.camera);
        self.bloom.config = self.settings.bloom.clone();
        self.bloom.write_params(queue);
        self.composite
            .write_params(queue, self.settings.composite_uniform(self.ctx.surface_is_srgb()));
    }

    /// Render and present one frame, then advance the orbit controller.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        orbit: &mut OrbitController,
        time: f32,
    ) -> Result<(), FrameError> {
        if self.state == PipelineState::Idle {
            log::info!("Frame pipeline running");
            self.state = PipelineState::Running;
        }
        self.clock.tick(time);

        if let Some(size) = self.resize.take() {
            self.apply_resize(size, orbit);
        }
        self.sync_environment(scene)?;
        self.sync_objects(scene);
        self.write_frame_uniforms(scene, orbit);
        self.targets.verify()?;

        let surface_texture = self.ctx.get_current_texture()?;
        let surface_size = TargetSize::new(
            surface_texture.texture.width(),
            surface_texture.texture.height(),
        );
        self.targets
            .layout
            .expect("surface", self.targets.layout.viewport, surface_size)?;
        let output = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let lists = DrawLists::snapshot(scene);
        let mut encoder = Some(self.ctx.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            },
        ));
        let mut surface_texture = Some(surface_texture);

        for pass in self.schedule.iter() {
            match pass {
                PassKind::Present => {
                    if let Some(encoder) = encoder.take() {
                        self.ctx.queue.submit(std::iter::once(encoder.finish()));
                    }
                    if let Some(texture) = surface_texture.take() {
                        texture.present();
                    }
                }
                PassKind::CameraUpdate => {
                    orbit.update(time);
                }
                _ => {
                    let Some(encoder) = encoder.as_mut() else {
                        log::warn!("'{}' scheduled after present, skipped", pass.label());
                        continue;
                    };
                    self.encode_pass(pass, encoder, scene, &lists, &output)?;
                }
            }
        }
        Ok(())
    }

    fn encode_pass(
        &self,
        pass: PassKind,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        lists: &DrawLists,
        output: &wgpu::TextureView,
    ) -> Result<(), FrameError> {
        let bindings = LitBindings {
            camera: &self.camera_group,
            lighting: &self.lighting_group,
            shadow: &self.shadow.bind_group,
        };
        match pass {
            PassKind::ShadowDepth => {
                self.shadow
                    .encode(encoder, &lists.casters, &self.objects, &self.pipelines);
            }
            PassKind::BloomScene => {
                let mut render_pass = begin_lit_pass(
                    encoder,
                    pass.label(),
                    &self.targets.bloom_scene,
                    wgpu::Color::TRANSPARENT,
                    &self.targets.depth.view,
                );
                if lists.bloom_sky {
                    self.skybox.draw(&mut render_pass);
                }
                draw_lit(&mut render_pass, &lists.bloom, &self.objects, &self.pipelines, &bindings);
            }
            PassKind::BloomHighPass => self.bloom.encode_high_pass(encoder, &self.targets)?,
            PassKind::BloomBlur { level } => self.bloom.encode_blur(encoder, level)?,
            PassKind::BloomAccumulate => self.bloom.encode_accumulate(encoder, &self.targets)?,
            PassKind::Base => {
                let mut render_pass = begin_lit_pass(
                    encoder,
                    pass.label(),
                    &self.targets.base,
                    clear_color(scene.clear_color),
                    &self.targets.depth.view,
                );
                if lists.base_sky {
                    self.skybox.draw(&mut render_pass);
                }
                draw_lit(&mut render_pass, &lists.base, &self.objects, &self.pipelines, &bindings);
            }
            PassKind::Composite => self.composite.encode(encoder, output)?,
            PassKind::Present | PassKind::CameraUpdate => {}
        }
        Ok(())
    }
}
