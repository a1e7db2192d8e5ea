//! Command-line argument parsing for the Ember renderer.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, ToneMappingMode};

/// Ember command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "ember", about = "Selective-bloom dissolve renderer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Initial dissolve progress (-20 to 20).
    #[arg(long, allow_hyphen_values = true)]
    pub process: Option<f32>,

    /// Exposure scalar applied before tone mapping.
    #[arg(long)]
    pub exposure: Option<f32>,

    /// Tone mapping curve.
    #[arg(long, value_enum)]
    pub tone_mapping: Option<ToneMappingMode>,

    /// Bloom strength.
    #[arg(long)]
    pub bloom_strength: Option<f32>,

    /// Directory with px/nx/py/ny/pz/nz environment faces.
    #[arg(long)]
    pub environment: Option<PathBuf>,

    /// glTF model to dissolve instead of the icosphere.
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// Render one frame on the CPU reference path to this PNG and exit.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(process) = args.process {
            self.material.process = process;
        }
        if let Some(exposure) = args.exposure {
            self.render.exposure = exposure;
        }
        if let Some(mode) = args.tone_mapping {
            self.render.tone_mapping = mode;
        }
        if let Some(strength) = args.bloom_strength {
            self.bloom.strength = strength;
        }
        if let Some(ref dir) = args.environment {
            self.scene.environment_dir = Some(dir.clone());
        }
        if let Some(ref path) = args.mesh {
            self.scene.mesh_path = Some(path.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            process: Some(-3.0),
            tone_mapping: Some(ToneMappingMode::Reinhard),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.material.process, -3.0);
        assert_eq!(config.render.tone_mapping, ToneMappingMode::Reinhard);
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 720);
        assert_eq!(config.bloom.strength, 0.5);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_negative_process_and_tone_mapping() {
        let args = CliArgs::parse_from([
            "ember",
            "--process",
            "-12.5",
            "--tone-mapping",
            "aces-filmic",
            "--snapshot",
            "out.png",
            "--mesh",
            "assets/suzanne.glb",
        ]);
        assert_eq!(args.process, Some(-12.5));
        assert_eq!(args.tone_mapping, Some(ToneMappingMode::AcesFilmic));
        assert_eq!(args.snapshot, Some(PathBuf::from("out.png")));

        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(
            config.scene.mesh_path,
            Some(PathBuf::from("assets/suzanne.glb"))
        );
    }
}
