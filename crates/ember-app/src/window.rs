//! Window and event loop.
//!
//! [`App`] implements winit's [`ApplicationHandler`]. Resizes are forwarded to
//! the frame pipeline, which applies them at the next frame boundary; loaded
//! assets are drained at the same point.

use std::sync::Arc;
use std::time::Instant;

use ember_config::Config;
use ember_materials::SharedShadingParams;
use ember_render::scene::{dissolve_object, shading_params};
use ember_render::{
    FrameError, FramePipeline, ObjectId, OrbitController, RenderSettings, Scene, SurfaceError,
    base_scene, init_render_context_blocking,
};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::controls::ParamControls;
use crate::loader::{AssetLoader, LoadRequest, LoadedAsset};

/// Pixels of a line-based wheel step.
const PIXELS_PER_LINE: f64 = 40.0;

/// Title and logical size from the window config.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
}

/// Pointer drag state for the orbit controller.
#[derive(Debug, Default)]
pub struct PointerState {
    dragging: bool,
    last: Option<(f64, f64)>,
}

impl PointerState {
    /// Any pressed button starts a drag.
    pub fn on_button(&mut self, state: ElementState) {
        self.dragging = state == ElementState::Pressed;
    }

    /// Record a cursor position; returns the drag delta while a button is held.
    pub fn on_moved(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let delta = self
            .last
            .filter(|_| self.dragging)
            .map(|(lx, ly)| ((x - lx) as f32, (y - ly) as f32));
        self.last = Some((x, y));
        delta
    }

    /// Forget the last position when the cursor leaves the window.
    pub fn on_left(&mut self) {
        self.last = None;
    }
}

/// Wheel delta in pixels; negative zooms in.
pub fn wheel_pixels(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -(y as f64 * PIXELS_PER_LINE) as f32,
        MouseScrollDelta::PixelDelta(p) => -p.y as f32,
    }
}

/// winit application: owns the scene, the GPU pipeline and the loader.
pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    pipeline: Option<FramePipeline>,
    scene: Scene,
    orbit: OrbitController,
    params: SharedShadingParams,
    controls: ParamControls,
    loader: Option<AssetLoader>,
    dissolve: Option<ObjectId>,
    pointer: PointerState,
    start: Instant,
    frames: u64,
}

impl App {
    /// Empty scene; GPU resources are created on resume.
    pub fn new(config: Config) -> Self {
        let params = SharedShadingParams::new(shading_params(&config.material));
        Self {
            scene: base_scene(&config),
            orbit: OrbitController::from_config(
                &config.scene,
                config.window.width,
                config.window.height,
            ),
            controls: ParamControls::new(params.snapshot()),
            params,
            window: None,
            pipeline: None,
            loader: None,
            dissolve: None,
            pointer: PointerState::default(),
            start: Instant::now(),
            frames: 0,
            config,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn std::error::Error>> {
        let attributes = window_attributes_from_config(&self.config);
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        let ctx = init_render_context_blocking(window.clone(), self.config.window.vsync)?;
        let mut pipeline = FramePipeline::new(ctx, RenderSettings::from_config(&self.config))?;
        pipeline.on_resize(size.width, size.height);
        info!(shaders = pipeline.shader_count(), "Frame pipeline ready");

        self.loader = Some(AssetLoader::spawn(LoadRequest::from_config(&self.config))?);
        self.orbit.set_aspect_ratio(size.width, size.height);
        self.pipeline = Some(pipeline);
        self.window = Some(window);
        self.start = Instant::now();
        Ok(())
    }

    /// Move finished assets into the scene.
    fn drain_assets(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        for asset in loader.drain() {
            match asset {
                LoadedAsset::DissolveMesh(mesh) => {
                    if let Some(old) = self.dissolve.take() {
                        self.scene.remove(old);
                    }
                    let object =
                        dissolve_object(Arc::new(mesh), &self.config.material, self.params.clone());
                    self.dissolve = Some(self.scene.add(object));
                    info!("Dissolve object added to scene");
                }
                LoadedAsset::Environment(faces) => {
                    let size = faces.size;
                    match self.scene.set_environment(Arc::new(faces)) {
                        Ok(()) => info!(size, "Environment map attached"),
                        Err(e) => warn!("Environment map rejected: {e}"),
                    }
                }
                LoadedAsset::Failed(e) => warn!("Asset failed to load: {e}"),
            }
        }
        if loader.is_finished() {
            self.loader = None;
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.drain_assets();
        let time = self.start.elapsed().as_secs_f32();
        let drift_speed = self.config.material.drift_speed;
        if drift_speed != 0.0 {
            self.params.update(|p| p.drift = time * drift_speed);
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        match pipeline.render_frame(&self.scene, &mut self.orbit, time) {
            Ok(()) => {}
            Err(FrameError::Surface(SurfaceError::Timeout)) => {
                warn!("Surface timeout, frame skipped");
            }
            Err(e) => {
                error!("Frame failed: {e}");
                event_loop.exit();
                return;
            }
        }

        self.frames += 1;
        let interval = self.config.debug.frame_stats_interval as u64;
        if interval > 0 && self.frames % interval == 0 {
            info!(
                frame = self.frames,
                fps = self.frames as f32 / time.max(f32::EPSILON),
                "Frame stats"
            );
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("Startup failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(pipeline) = self.pipeline.as_mut() {
                    pipeline.on_resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(action) = self.controls.resolve(&event) {
                    self.controls.apply(&self.params, action);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.pointer.on_button(state),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((dx, dy)) = self.pointer.on_moved(position.x, position.y) {
                    let height = self.window.as_ref().map_or(1, |w| w.inner_size().height);
                    self.orbit.drag(dx, dy, height);
                }
            }
            WindowEvent::CursorLeft { .. } => self.pointer.on_left(),
            WindowEvent::MouseWheel { delta, .. } => self.orbit.wheel(wheel_pixels(delta)),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Create an event loop and run until the window closes.
pub fn run(config: Config) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop failed: {e}");
    }
}
