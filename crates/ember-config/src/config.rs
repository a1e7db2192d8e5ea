//! Configuration structs with sensible defaults and RON persistence.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory name used under the OS configuration directory.
pub const APP_DIR_NAME: &str = "ember";

/// Accepted dissolve progress.
pub const PROCESS_LIMITS: RangeInclusive<f32> = -20.0..=20.0;
/// Accepted noise frequency.
pub const FREQUENCY_LIMITS: RangeInclusive<f32> = 0.0..=1.0;
/// Accepted edge emissive multiplier.
pub const STRENGTH_LIMITS: RangeInclusive<f32> = 1.0..=20.0;
/// Accepted bloom radius.
pub const BLOOM_RADIUS_LIMITS: RangeInclusive<f32> = 0.0..=1.0;
/// Accepted number of bloom blur levels.
pub const BLOOM_LEVEL_LIMITS: RangeInclusive<u32> = 1..=8;

/// Top-level renderer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Output and lighting settings.
    pub render: RenderConfig,
    /// Selective bloom settings.
    pub bloom: BloomSettings,
    /// Initial dissolve material parameters.
    pub material: MaterialConfig,
    /// Scene layout: camera, light, meshes, environment.
    pub scene: SceneConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Tone mapping curve applied by the composite stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ToneMappingMode {
    /// No tone mapping; values above 1.0 are left to the output format.
    None,
    /// Exposure then clamp to \[0, 1\].
    Linear,
    /// `c / (1 + c)`.
    Reinhard,
    /// Hejl/Burgess-Dawson filmic curve.
    Cineon,
    /// Narkowicz ACES fit.
    AcesFilmic,
}

/// Output and lighting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Exposure scalar applied before tone mapping.
    pub exposure: f32,
    /// Tone mapping curve.
    pub tone_mapping: ToneMappingMode,
    /// Clear color of the base pass (linear RGB).
    pub clear_color: [f32; 3],
    /// Shadow map resolution (width = height).
    pub shadow_map_size: u32,
    /// Flat environment color used until an environment map arrives (linear RGB).
    pub environment_color: [f32; 3],
    /// Environment reflection intensity.
    pub environment_intensity: f32,
}

/// Selective bloom configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomSettings {
    /// Overall glow multiplier.
    pub strength: f32,
    /// Blur footprint and level weighting, \[0, 1\].
    pub radius: f32,
    /// Luminance threshold of the high-pass.
    pub threshold: f32,
    /// Width of the smooth threshold transition.
    pub soft_knee: f32,
    /// Number of blur levels in the mip chain.
    pub levels: u32,
}

/// Initial values of the dissolve material parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MaterialConfig {
    /// Dissolve progress, \[-20, 20\].
    pub process: f32,
    /// Noise frequency for displacement and dissolve.
    pub frequency: f32,
    /// Vertex displacement amplitude along the normal.
    pub displacement: f32,
    /// Fourth noise coordinate; animates the dissolve pattern.
    pub drift: f32,
    /// Width of the glowing band above the dissolve threshold.
    pub edge_width: f32,
    /// Edge color (linear RGB).
    pub edge_color: [f32; 3],
    /// Edge emissive multiplier.
    pub strength: f32,
    /// Roughness applied inside the glowing band.
    pub edge_roughness: f32,
    /// Base material roughness.
    pub roughness: f32,
    /// Base material metalness.
    pub metalness: f32,
    /// Base material albedo (linear RGB).
    pub albedo: [f32; 3],
    /// Drift speed in noise units per second (0 = static pattern).
    pub drift_speed: f32,
}

/// Scene layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Initial camera position.
    pub camera_position: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
    /// Orbit damping factor per 60 Hz frame (0 = no damping).
    pub damping_factor: f32,
    /// Directional light position; the light points at the origin.
    pub light_position: [f32; 3],
    /// Directional light color (linear RGB).
    pub light_color: [f32; 3],
    /// Directional light intensity.
    pub light_intensity: f32,
    /// Dissolving icosphere radius.
    pub sphere_radius: f32,
    /// Icosphere subdivision detail.
    pub sphere_detail: u32,
    /// Shadow-test plane edge length.
    pub plane_size: f32,
    /// Shadow-test plane subdivisions per side.
    pub plane_segments: u32,
    /// Shadow-test plane distance along +Z.
    pub plane_offset: f32,
    /// Directory holding the six environment cube faces, if any.
    pub environment_dir: Option<PathBuf>,
    /// glTF model that replaces the icosphere once it loads.
    pub mesh_path: Option<PathBuf>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log frame timing every N frames (0 = never).
    pub frame_stats_interval: u32,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            title: "Ember".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            exposure: 0.1,
            tone_mapping: ToneMappingMode::Cineon,
            clear_color: [0.0, 0.0, 0.0],
            shadow_map_size: 2048,
            environment_color: [0.25, 0.27, 0.32],
            environment_intensity: 0.5,
        }
    }
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 0.5,
            radius: 0.25,
            threshold: 0.2,
            soft_knee: 0.01,
            levels: 5,
        }
    }
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            process: 0.0,
            frequency: 0.85,
            displacement: 0.15,
            drift: 0.0,
            edge_width: 0.8,
            // #4d9bff converted to linear
            edge_color: [0.074_214, 0.327_778, 1.0],
            strength: 16.0,
            edge_roughness: 0.0,
            roughness: 0.0,
            metalness: 1.0,
            albedo: [1.0, 1.0, 1.0],
            drift_speed: 0.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera_position: [5.0, 5.0, -5.0],
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            damping_factor: 0.05,
            light_position: [0.0, 0.0, -5.0],
            light_color: [1.0, 1.0, 1.0],
            light_intensity: 1.0,
            sphere_radius: 2.0,
            sphere_detail: 32,
            plane_size: 10.0,
            plane_segments: 32,
            plane_offset: 5.0,
            environment_dir: None,
            mesh_path: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            frame_stats_interval: 0,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Default config directory: `<os config dir>/ember`.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the values the renderer cannot clamp on its own: dissolve and
    /// bloom ranges, window size, and the asset paths named by the scene.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("material.process", self.material.process, &PROCESS_LIMITS)?;
        check_range("material.frequency", self.material.frequency, &FREQUENCY_LIMITS)?;
        check_range("material.strength", self.material.strength, &STRENGTH_LIMITS)?;
        check_range("bloom.radius", self.bloom.radius, &BLOOM_RADIUS_LIMITS)?;
        check_range("bloom.strength", self.bloom.strength, &(0.0..=f32::MAX))?;
        check_range("bloom.levels", self.bloom.levels, &BLOOM_LEVEL_LIMITS)?;
        check_range("window.width", self.window.width, &(1..=u32::MAX))?;
        check_range("window.height", self.window.height, &(1..=u32::MAX))?;

        if let Some(dir) = &self.scene.environment_dir
            && !dir.is_dir()
        {
            return Err(ConfigError::MissingEnvironmentDir(dir.clone()));
        }
        if let Some(path) = &self.scene.mesh_path
            && !path.is_file()
        {
            return Err(ConfigError::MissingMesh(path.clone()));
        }
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let new_config = Self::read(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn check_range<T>(
    field: &'static str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<(), ConfigError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("tone_mapping: Cineon"));
    }

    #[test]
    fn test_defaults_match_reference_scene() {
        let config = Config::default();
        assert_eq!(config.bloom.strength, 0.5);
        assert_eq!(config.bloom.radius, 0.25);
        assert_eq!(config.bloom.threshold, 0.2);
        assert_eq!(config.bloom.levels, 5);
        assert_eq!(config.render.exposure, 0.1);
        assert_eq!(config.material.frequency, 0.85);
        assert_eq!(config.material.strength, 16.0);
        assert_eq!(config.material.edge_width, 0.8);
        assert_eq!(config.scene.camera_position, [5.0, 5.0, -5.0]);
        assert_eq!(config.scene.sphere_radius, 2.0);
    }

    #[test]
    fn test_default_edge_roughness_does_not_exceed_base() {
        let material = MaterialConfig::default();
        assert!(material.edge_roughness <= material.roughness);
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let ron_str = "(bloom: (strength: 1.5))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.bloom.strength, 1.5);
        assert_eq!(config.bloom.threshold, 0.2);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_environment_dir_roundtrips() {
        let mut config = Config::default();
        config.scene.environment_dir = Some(PathBuf::from("assets/env"));
        let ron_str = ron::to_string(&config).unwrap();
        let parsed: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(
            parsed.scene.environment_dir.as_deref(),
            Some(Path::new("assets/env"))
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.render.tone_mapping = ToneMappingMode::AcesFilmic;
        config.material.process = -4.5;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.bloom.levels = 3;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().bloom.levels, 3);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_process_outside_slider_range_is_rejected() {
        let mut config = Config::default();
        config.material.process = 25.0;
        match config.validate() {
            Err(ConfigError::OutOfRange { field, value, .. }) => {
                assert_eq!(field, "material.process");
                assert_eq!(value, 25.0);
            }
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn test_bloom_ranges_are_checked() {
        let mut config = Config::default();
        config.bloom.radius = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "bloom.radius", .. })
        ));

        let mut config = Config::default();
        config.bloom.levels = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "bloom.levels", .. })
        ));
    }

    #[test]
    fn test_missing_asset_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.scene.environment_dir = Some(dir.path().join("no-such-env"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvironmentDir(_))
        ));

        let mut config = Config::default();
        config.scene.mesh_path = Some(dir.path().join("suzanne.glb"));
        assert!(matches!(config.validate(), Err(ConfigError::MissingMesh(_))));

        config.scene.mesh_path = None;
        config.scene.environment_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("config.ron"), "{err}");
    }
}
