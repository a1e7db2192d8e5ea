//! Frame pipeline for selective bloom: layered scene, shadow prepass, the
//! bloom chain, base pass and composite, plus a CPU reference renderer that
//! runs the same schedule on float images.

pub mod bloom;
pub mod buffer;
pub mod camera;
pub mod composite;
pub mod depth;
pub mod frame;
pub mod gpu;
pub mod layers;
pub mod orbit;
pub mod pass;
pub mod reference;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod shader;
pub mod shadow;
pub mod skybox;
pub mod surface;
pub mod surface_pipeline;
pub mod target;
pub mod texture;

pub use bloom::{BloomConfig, BloomStage};
pub use buffer::{BufferAllocator, GpuMesh};
pub use camera::{CameraUniform, PerspectiveCamera};
pub use composite::{CompositeStage, CompositeUniform, ToneMapping, composite_pixel};
pub use depth::DepthBuffer;
pub use frame::{FrameClock, FrameError, FrameSchedule, PassKind, PipelineState};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use layers::{BLOOM_LAYER, DEFAULT_LAYER, Layers};
pub use orbit::OrbitController;
pub use reference::{FrameOutput, HdrImage, RasterStats, ReferenceRenderer};
pub use renderer::FramePipeline;
pub use scene::{ObjectId, Scene, SceneError, SceneObject, base_scene};
pub use settings::RenderSettings;
pub use shader::{ShaderError, ShaderLibrary};
pub use skybox::{Skybox, SkyboxStage};
pub use surface::{PhysicalSize, ResizeQueue};
pub use target::{FrameTargets, TargetLayout, TargetSize};
pub use texture::{CubeFaces, EnvironmentMap, TextureError};
