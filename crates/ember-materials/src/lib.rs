//! Surface shading: shared dissolve parameters, simplex noise, hook injection
//! into WGSL templates, and the CPU twins of the color and depth variants.

pub mod dissolve;
pub mod hooks;
pub mod noise;
mod params;
pub mod template;
pub mod wgsl;

pub use dissolve::DissolveHooks;
pub use hooks::{
    BaseMaterial, DepthProgram, DepthVariant, ExtendedMaterial, Fragment, LightingContext,
    NoHooks, ShadingHooks, SurfaceInputs, SurfaceProgram,
};
pub use params::{
    FREQUENCY_RANGE, PROCESS_EXTENT, PROCESS_MAX, PROCESS_MIN, PROCESS_RANGE, STRENGTH_RANGE,
    ShadingParams, ShadingUniform, SharedShadingParams,
};
pub use template::{HookPoint, ShaderTemplate, TemplateError};
pub use wgsl::SurfaceVariant;
