//! Renderer settings derived from the loaded configuration.

use ember_config::Config;
use ember_lighting::ShadowMapConfig;

use crate::bloom::BloomConfig;
use crate::composite::{CompositeUniform, ToneMapping};

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub bloom: BloomConfig,
    pub exposure: f32,
    pub tone_mapping: ToneMapping,
    pub shadow: ShadowMapConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            bloom: BloomConfig::default(),
            exposure: 0.1,
            tone_mapping: ToneMapping::Cineon,
            shadow: ShadowMapConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Clamped render settings from the loaded config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            bloom: BloomConfig::from(&config.bloom),
            exposure: config.render.exposure.max(0.0),
            tone_mapping: config.render.tone_mapping.into(),
            shadow: ShadowMapConfig {
                resolution: config.render.shadow_map_size.max(1),
                ..Default::default()
            },
        }
    }

    /// Composite parameters; encode in the shader unless the output is sRGB.
    pub fn composite_uniform(&self, output_is_srgb: bool) -> CompositeUniform {
        CompositeUniform::new(self.exposure, self.tone_mapping, !output_is_srgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let settings = RenderSettings::from_config(&Config::default());
        assert_eq!(settings.exposure, 0.1);
        assert_eq!(settings.tone_mapping, ToneMapping::Cineon);
        assert_eq!(settings.bloom, BloomConfig::default());
    }

    #[test]
    fn test_config_limits_match_renderer_ranges() {
        use ember_materials::{FREQUENCY_RANGE, PROCESS_RANGE, STRENGTH_RANGE};
        assert_eq!(ember_config::PROCESS_LIMITS, PROCESS_RANGE);
        assert_eq!(ember_config::FREQUENCY_LIMITS, FREQUENCY_RANGE);
        assert_eq!(ember_config::STRENGTH_LIMITS, STRENGTH_RANGE);
        assert_eq!(*ember_config::BLOOM_LEVEL_LIMITS.end(), crate::bloom::MAX_LEVELS);
    }

    #[test]
    fn test_srgb_output_skips_shader_encode() {
        let settings = RenderSettings::default();
        assert_eq!(settings.composite_uniform(true).encode_srgb, 0);
        assert_eq!(settings.composite_uniform(false).encode_srgb, 1);
    }
}
