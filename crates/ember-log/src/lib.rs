//! Logging setup for the Ember renderer.
//!
//! Library crates log through the `log` facade; this crate installs the
//! `tracing` subscriber that receives those records (via the `tracing-log`
//! bridge) together with the host's own `tracing` events. Output goes to the
//! console, and in debug builds also to a JSON file in the log directory.

use ember_config::Config;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config provides one.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "ember.log";

/// Resolve the filter directive string for the given config.
///
/// A bare level from the config (e.g. `"debug"`) keeps the GPU crates at
/// `warn`; a full directive list is taken as-is.
pub fn filter_directives(config: Option<&Config>) -> String {
    let level = config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty());

    match level {
        None => DEFAULT_FILTER.to_string(),
        Some(level) if level.contains('=') || level.contains(',') => level.to_string(),
        Some(level) => format!("{level},wgpu=warn,naga=warn"),
    }
}

/// Path of the JSON log file inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the config. The JSON file layer is only attached when
/// `debug_build` is set and `log_dir` can be created; failures there fall
/// back to console-only logging.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let directives = filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_file_path(log_dir))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
