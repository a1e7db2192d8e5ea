//! Ember binary.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags. `--snapshot out.png` renders one frame on the CPU and exits.

use std::process::ExitCode;

use clap::Parser;
use ember_app::platform::PlatformDirs;
use ember_app::{snapshot, window};
use ember_config::{CliArgs, Config};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve_or(args.config.as_deref()) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to resolve config directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    ember_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!(config_dir = %dirs.config_dir.display(), "Ember starting");

    if let Some(path) = &args.snapshot {
        return match snapshot::write_snapshot(&config, path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Snapshot failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    window::run(config);
    ExitCode::SUCCESS
}
