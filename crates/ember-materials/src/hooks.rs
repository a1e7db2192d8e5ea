//! CPU-side composition of a frozen base material with extension hooks.
//!
//! [`BaseMaterial`] is the opaque lighting routine. [`ShadingHooks`] are the
//! named points where an effect may intervene: vertex position, fragment
//! discard, and the lighting inputs. [`ExtendedMaterial`] wires the two into
//! the color variant, [`DepthVariant`] reuses the same hooks for depth-only
//! rendering. The GPU equivalent is [`crate::template`].

use ember_lighting::{DirectionalLight, EnvironmentLighting, PbrMaterial, SurfaceSample, shade_cpu};
use glam::Vec3;

/// Lighting inputs of a surface point, before lighting is evaluated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceInputs {
    pub albedo: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: Vec3,
}

impl SurfaceInputs {
    /// Attach a surface point to these inputs.
    pub fn at(&self, position: Vec3, normal: Vec3) -> SurfaceSample {
        SurfaceSample {
            position,
            normal,
            albedo: self.albedo,
            metallic: self.metallic,
            roughness: self.roughness,
            emissive: self.emissive,
        }
    }
}

/// Everything lighting needs besides the surface itself.
#[derive(Clone, Copy, Debug)]
pub struct LightingContext<'a> {
    pub view_position: Vec3,
    pub light: &'a DirectionalLight,
    pub environment: &'a EnvironmentLighting,
    /// Fraction of direct light reaching the fragment.
    pub shadow: f32,
}

/// A rasterized fragment in both object and world space.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    /// Undisplaced object-space position, interpolated.
    pub object_position: Vec3,
    pub world_position: Vec3,
    pub world_normal: Vec3,
}

/// The opaque lighting routine extended by hooks.
pub trait BaseMaterial {
    fn surface_inputs(&self) -> SurfaceInputs;
    fn shade(&self, sample: &SurfaceSample, ctx: &LightingContext<'_>) -> Vec3;
}

impl BaseMaterial for PbrMaterial {
    fn surface_inputs(&self) -> SurfaceInputs {
        SurfaceInputs {
            albedo: self.albedo,
            metallic: self.metallic,
            roughness: self.roughness,
            emissive: self.emissive_output(),
        }
    }

    fn shade(&self, sample: &SurfaceSample, ctx: &LightingContext<'_>) -> Vec3 {
        shade_cpu(sample, ctx.view_position, ctx.light, ctx.shadow, ctx.environment)
    }
}

/// Extension points. Every method defaults to leaving the base untouched.
pub trait ShadingHooks {
    /// Object-space vertex position after displacement.
    fn displace(&self, position: Vec3, _normal: Vec3) -> Vec3 {
        position
    }

    /// Whether the fragment at this object-space position is dropped.
    fn discard(&self, _object_position: Vec3) -> bool {
        false
    }

    /// Replace lighting inputs for a surviving fragment.
    fn override_surface(&self, _object_position: Vec3, inputs: SurfaceInputs) -> SurfaceInputs {
        inputs
    }
}

/// Hooks that change nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl ShadingHooks for NoHooks {}

/// Color output of a material variant.
pub trait SurfaceProgram {
    fn vertex(&self, position: Vec3, normal: Vec3) -> Vec3;
    /// Lit color, or `None` when the fragment is discarded.
    fn fragment(&self, fragment: &Fragment, ctx: &LightingContext<'_>) -> Option<Vec3>;
    /// The discard decision of [`SurfaceProgram::fragment`] without lighting.
    fn keeps(&self, object_position: Vec3) -> bool;
}

/// Depth-only output of a material variant.
pub trait DepthProgram {
    fn vertex(&self, position: Vec3, normal: Vec3) -> Vec3;
    /// Whether the fragment writes depth.
    fn keeps(&self, object_position: Vec3) -> bool;
}

/// Base material plus hooks: the color variant.
#[derive(Clone, Debug)]
pub struct ExtendedMaterial<B, H> {
    pub base: B,
    pub hooks: H,
}

impl<B: BaseMaterial, H: ShadingHooks> ExtendedMaterial<B, H> {
    /// Wrap `base` with a set of hooks.
    pub fn new(base: B, hooks: H) -> Self {
        Self { base, hooks }
    }

    /// Lighting inputs after hooks, or `None` if discarded.
    pub fn surface(&self, object_position: Vec3) -> Option<SurfaceInputs> {
        if self.hooks.discard(object_position) {
            return None;
        }
        Some(
            self.hooks
                .override_surface(object_position, self.base.surface_inputs()),
        )
    }
}

impl<B: BaseMaterial, H: ShadingHooks> SurfaceProgram for ExtendedMaterial<B, H> {
    fn vertex(&self, position: Vec3, normal: Vec3) -> Vec3 {
        self.hooks.displace(position, normal)
    }

    fn fragment(&self, fragment: &Fragment, ctx: &LightingContext<'_>) -> Option<Vec3> {
        let inputs = self.surface(fragment.object_position)?;
        let sample = inputs.at(fragment.world_position, fragment.world_normal);
        Some(self.base.shade(&sample, ctx))
    }

    fn keeps(&self, object_position: Vec3) -> bool {
        !self.hooks.discard(object_position)
    }
}

/// Same displacement and discard as the color variant, no lighting.
#[derive(Clone, Debug)]
pub struct DepthVariant<H> {
    pub hooks: H,
}

impl<H: ShadingHooks> DepthVariant<H> {
    /// Depth variant running the given hooks.
    pub fn new(hooks: H) -> Self {
        Self { hooks }
    }
}

impl<H: ShadingHooks> DepthProgram for DepthVariant<H> {
    fn vertex(&self, position: Vec3, normal: Vec3) -> Vec3 {
        self.hooks.displace(position, normal)
    }

    fn keeps(&self, object_position: Vec3) -> bool {
        !self.hooks.discard(object_position)
    }
}
