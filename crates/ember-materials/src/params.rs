//! Material shading parameters shared by the color and depth variants.

use std::cell::{Ref, RefCell};
use std::ops::RangeInclusive;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Lowest dissolve progress: nothing is discarded.
pub const PROCESS_MIN: f32 = -20.0;
/// Highest dissolve progress: only saturated noise survives.
pub const PROCESS_MAX: f32 = 20.0;
/// Scale from clamped noise (`[-1, 1]`) to dissolve values.
pub const PROCESS_EXTENT: f32 = 20.0;

/// Dissolve progress slider range.
pub const PROCESS_RANGE: RangeInclusive<f32> = PROCESS_MIN..=PROCESS_MAX;
/// Noise frequency slider range.
pub const FREQUENCY_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Edge emissive multiplier range.
pub const STRENGTH_RANGE: RangeInclusive<f32> = 1.0..=20.0;

/// Current values of the dissolve effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingParams {
    /// Dissolve progress in [`PROCESS_RANGE`].
    pub process: f32,
    /// Spatial frequency of the noise.
    pub frequency: f32,
    /// Displacement amplitude along the vertex normal.
    pub displacement: f32,
    /// Fourth noise coordinate; moving it animates the pattern.
    pub drift: f32,
    /// Width of the glowing band above the discard threshold.
    pub edge_width: f32,
    /// Linear RGB.
    pub edge_color: Vec3,
    /// Emissive multiplier inside the band.
    pub strength: f32,
    /// Roughness inside the band. Kept at or below the base roughness so the
    /// rim reads as a smooth emitter.
    pub edge_roughness: f32,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            process: 0.0,
            frequency: 0.85,
            displacement: 0.15,
            drift: 0.0,
            edge_width: 0.8,
            edge_color: Vec3::new(0.074_214, 0.327_778, 1.0),
            strength: 16.0,
            edge_roughness: 0.0,
        }
    }
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

impl ShadingParams {
    /// Clamp every ranged field to its slider range.
    pub fn clamped(mut self) -> Self {
        self.process = clamp_to(self.process, &PROCESS_RANGE);
        self.frequency = clamp_to(self.frequency, &FREQUENCY_RANGE);
        self.strength = clamp_to(self.strength, &STRENGTH_RANGE);
        self.edge_width = self.edge_width.max(0.0);
        self.displacement = self.displacement.max(0.0);
        self
    }

    /// Set the dissolve progress, clamped to [`PROCESS_RANGE`].
    pub fn set_process(&mut self, process: f32) {
        self.process = clamp_to(process, &PROCESS_RANGE);
    }

    /// Clamped to [`FREQUENCY_RANGE`].
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = clamp_to(frequency, &FREQUENCY_RANGE);
    }

    /// Clamped to [`STRENGTH_RANGE`].
    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp_to(strength, &STRENGTH_RANGE);
    }

    /// Emissive color applied inside the edge band.
    pub fn edge_emissive(&self) -> Vec3 {
        self.edge_color * self.strength
    }

    /// Pack into the layout both dissolve pipelines bind.
    pub fn to_uniform(&self) -> ShadingUniform {
        ShadingUniform {
            process_frequency_displacement_drift: [
                self.process,
                self.frequency,
                self.displacement,
                self.drift,
            ],
            edge_color_strength: [
                self.edge_color.x,
                self.edge_color.y,
                self.edge_color.z,
                self.strength,
            ],
            edge_width_roughness_extent: [
                self.edge_width,
                self.edge_roughness,
                PROCESS_EXTENT,
                0.0,
            ],
        }
    }
}

/// GPU-side shading parameters, 48 bytes.
///
/// One buffer per dissolving object, bound to both its color and depth
/// pipelines.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ShadingUniform {
    pub process_frequency_displacement_drift: [f32; 4],
    /// xyz = edge color, w = strength.
    pub edge_color_strength: [f32; 4],
    /// x = edge width, y = edge roughness, z = extent, w = padding.
    pub edge_width_roughness_extent: [f32; 4],
}

/// Shared, mutable handle to one set of [`ShadingParams`].
///
/// Clones share the same values. The host mutates through [`update`](Self::update)
/// between frames; renderers take a [`snapshot`](Self::snapshot) at pass start.
#[derive(Clone, Debug, Default)]
pub struct SharedShadingParams(Rc<RefCell<ShadingParams>>);

impl SharedShadingParams {
    /// Start a shared set from `params`.
    pub fn new(params: ShadingParams) -> Self {
        Self(Rc::new(RefCell::new(params.clamped())))
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> ShadingParams {
        *self.0.borrow()
    }

    /// Read the current values without copying.
    pub fn borrow(&self) -> Ref<'_, ShadingParams> {
        self.0.borrow()
    }

    /// Mutate in place; ranged fields are re-clamped afterwards.
    pub fn update(&self, f: impl FnOnce(&mut ShadingParams)) {
        let mut params = self.0.borrow_mut();
        f(&mut params);
        *params = params.clamped();
    }

    /// Whether two handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<ShadingUniform>(), 48);
    }

    #[test]
    fn test_defaults_in_range() {
        let p = ShadingParams::default();
        assert!(PROCESS_RANGE.contains(&p.process));
        assert!(FREQUENCY_RANGE.contains(&p.frequency));
        assert!(STRENGTH_RANGE.contains(&p.strength));
        assert_eq!(p, p.clamped());
    }

    #[test]
    fn test_setters_clamp() {
        let mut p = ShadingParams::default();
        p.set_process(35.0);
        assert_eq!(p.process, PROCESS_MAX);
        p.set_process(-100.0);
        assert_eq!(p.process, PROCESS_MIN);
        p.set_frequency(4.0);
        assert_eq!(p.frequency, 1.0);
        p.set_strength(0.0);
        assert_eq!(p.strength, 1.0);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let a = SharedShadingParams::default();
        let b = a.clone();
        a.update(|p| p.process = 7.5);
        assert_eq!(b.snapshot().process, 7.5);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_update_reclamps() {
        let shared = SharedShadingParams::default();
        shared.update(|p| p.process += 1000.0);
        assert_eq!(shared.snapshot().process, PROCESS_MAX);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let shared = SharedShadingParams::default();
        let before = shared.snapshot();
        shared.update(|p| p.strength = 3.0);
        assert_eq!(before.strength, 16.0);
        assert_eq!(shared.borrow().strength, 3.0);
    }

    #[test]
    fn test_uniform_packing() {
        let p = ShadingParams {
            process: -3.0,
            frequency: 0.5,
            displacement: 0.1,
            drift: 2.0,
            edge_width: 0.8,
            edge_color: Vec3::new(0.1, 0.2, 0.3),
            strength: 10.0,
            edge_roughness: 0.2,
        };
        let u = p.to_uniform();
        assert_eq!(u.process_frequency_displacement_drift, [-3.0, 0.5, 0.1, 2.0]);
        assert_eq!(u.edge_color_strength, [0.1, 0.2, 0.3, 10.0]);
        assert_eq!(u.edge_width_roughness_extent, [0.8, 0.2, PROCESS_EXTENT, 0.0]);
        assert!((p.edge_emissive() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }
}
