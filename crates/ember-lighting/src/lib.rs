//! Lighting model for the Ember renderer: Cook-Torrance PBR, a single
//! directional light, and its soft shadow map.
//!
//! Every GPU-side formula has a CPU twin here so shading can be verified in
//! unit tests and reproduced by the reference renderer.

mod directional;
pub mod environment;
pub mod pbr;
pub mod shadow;

pub use directional::{DirectionalLight, DirectionalLightUniform};
pub use environment::{EnvironmentLighting, EnvironmentUniform};
pub use pbr::{MIN_ROUGHNESS, PbrMaterial, PbrMaterialUniform, SurfaceSample, shade_cpu};
pub use shadow::{ShadowDepthMap, ShadowMap, ShadowMapConfig, ShadowUniform, light_view_projection};
