//! Frame vocabulary shared by the GPU pipeline and the CPU reference:
//! the pass order, the pipeline state and the frame clock.

use ember_materials::TemplateError;
use thiserror::Error;

use crate::gpu::SurfaceError;
use crate::shader::ShaderError;
use crate::texture::TextureError;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("shader '{label}' failed to compile: {message}")]
    ShaderCompilation { label: String, message: String },

    #[error("shader template: {0}")]
    Template(#[from] TemplateError),

    #[error("{target} is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        target: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("{stage} stage used before its targets were built")]
    Unconfigured { stage: &'static str },

    #[error("environment map: {0}")]
    Texture(#[from] TextureError),

    #[error("surface: {0}")]
    Surface(#[from] SurfaceError),
}

impl From<ShaderError> for FrameError {
    fn from(err: ShaderError) -> Self {
        match err {
            ShaderError::CompilationFailed { label, message } => {
                FrameError::ShaderCompilation { label, message }
            }
            ShaderError::NotLoaded { label } => FrameError::ShaderCompilation {
                label,
                message: "module was never compiled".to_string(),
            },
        }
    }
}

/// One step of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Light-space depth of every shadow caster.
    ShadowDepth,
    /// Bloom-layer objects, lit, into the bloom scene buffer.
    BloomScene,
    /// Luminance high-pass of the bloom scene.
    BloomHighPass,
    /// Horizontal then vertical blur of one level.
    BloomBlur { level: usize },
    /// Weighted sum of every level into the glow buffer.
    BloomAccumulate,
    /// Default-layer objects, lit and shadowed, into the base buffer.
    Base,
    /// base + glow, exposure, tone mapping, encoding.
    Composite,
    Present,
    /// Orbit controller damping step.
    CameraUpdate,
}

impl PassKind {
    /// Label used for GPU debug markers and logs.
    pub fn label(self) -> &'static str {
        match self {
            PassKind::ShadowDepth => "shadow-depth",
            PassKind::BloomScene => "bloom-scene",
            PassKind::BloomHighPass => "bloom-high-pass",
            PassKind::BloomBlur { .. } => "bloom-blur",
            PassKind::BloomAccumulate => "bloom-accumulate",
            PassKind::Base => "base",
            PassKind::Composite => "composite",
            PassKind::Present => "present",
            PassKind::CameraUpdate => "camera-update",
        }
    }

    /// Whether the pass writes an image that ends up on screen.
    pub fn is_presented(self) -> bool {
        matches!(self, PassKind::Composite | PassKind::Present)
    }
}

/// Ordered list of passes executed every frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSchedule {
    passes: Vec<PassKind>,
}

impl FrameSchedule {
    /// Shadow, bloom, base, composite, present, camera update.
    pub fn standard(levels: usize) -> Self {
        let mut passes = vec![PassKind::ShadowDepth, PassKind::BloomScene, PassKind::BloomHighPass];
        passes.extend((0..levels).map(|level| PassKind::BloomBlur { level }));
        passes.extend([
            PassKind::BloomAccumulate,
            PassKind::Base,
            PassKind::Composite,
            PassKind::Present,
            PassKind::CameraUpdate,
        ]);
        Self { passes }
    }

    /// Passes in execution order.
    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    /// Pass kinds in execution order.
    pub fn iter(&self) -> impl Iterator<Item = PassKind> + '_ {
        self.passes.iter().copied()
    }

    /// Index of the first pass of this kind.
    pub fn position(&self, kind: PassKind) -> Option<usize> {
        self.passes.iter().position(|&p| p == kind)
    }

    /// Number of blur passes.
    pub fn blur_levels(&self) -> usize {
        self.passes
            .iter()
            .filter(|p| matches!(p, PassKind::BloomBlur { .. }))
            .count()
    }

    /// Number of passes per frame.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Lifecycle of a frame pipeline. There is no terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
}

/// Frame counter and timing.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    frame: u64,
    last_time: Option<f32>,
    delta: f32,
}

impl FrameClock {
    /// Clock before the first tick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a frame at `time` seconds; returns the delta.
    /// Time running backwards yields a zero delta.
    pub fn tick(&mut self, time: f32) -> f32 {
        self.delta = self.last_time.map_or(0.0, |last| (time - last).max(0.0));
        self.last_time = Some(time);
        self.frame += 1;
        self.delta
    }

    /// Frames ticked so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds since the previous tick.
    pub fn delta(&self) -> f32 {
        self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schedule_order() {
        let schedule = FrameSchedule::standard(2);
        assert_eq!(
            schedule.passes(),
            &[
                PassKind::ShadowDepth,
                PassKind::BloomScene,
                PassKind::BloomHighPass,
                PassKind::BloomBlur { level: 0 },
                PassKind::BloomBlur { level: 1 },
                PassKind::BloomAccumulate,
                PassKind::Base,
                PassKind::Composite,
                PassKind::Present,
                PassKind::CameraUpdate,
            ]
        );
    }

    #[test]
    fn test_bloom_completes_before_composite() {
        let schedule = FrameSchedule::standard(5);
        let accumulate = schedule.position(PassKind::BloomAccumulate).unwrap();
        let composite = schedule.position(PassKind::Composite).unwrap();
        let shadow = schedule.position(PassKind::ShadowDepth).unwrap();
        let base = schedule.position(PassKind::Base).unwrap();
        assert!(shadow < base);
        assert!(accumulate < composite);
        assert_eq!(schedule.position(PassKind::CameraUpdate), Some(schedule.len() - 1));
        assert_eq!(schedule.blur_levels(), 5);
    }

    #[test]
    fn test_only_composite_is_presented() {
        let schedule = FrameSchedule::standard(3);
        let presented: Vec<PassKind> = schedule.iter().filter(|p| p.is_presented()).collect();
        assert_eq!(presented, vec![PassKind::Composite, PassKind::Present]);
    }

    #[test]
    fn test_frame_clock_deltas() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(1.0), 0.0);
        assert!((clock.tick(1.5) - 0.5).abs() < 1e-6);
        assert_eq!(clock.tick(1.2), 0.0);
        assert_eq!(clock.frame(), 3);
    }

    #[test]
    fn test_shader_error_maps_to_compilation() {
        let err: FrameError = ShaderError::CompilationFailed {
            label: "bloom-blur".into(),
            message: "bad".into(),
        }
        .into();
        assert!(matches!(
            err,
            FrameError::ShaderCompilation { ref label, .. } if label == "bloom-blur"
        ));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = FrameError::DimensionMismatch {
            target: "glow",
            expected: (640, 360),
            actual: (320, 180),
        };
        assert_eq!(err.to_string(), "glow is (320, 180), expected (640, 360)");
    }
}
