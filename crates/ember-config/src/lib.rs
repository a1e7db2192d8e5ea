//! Configuration system for the Ember renderer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BLOOM_LEVEL_LIMITS, BLOOM_RADIUS_LIMITS, BloomSettings, Config, DebugConfig, FREQUENCY_LIMITS,
    MaterialConfig, PROCESS_LIMITS, RenderConfig, STRENGTH_LIMITS, SceneConfig, ToneMappingMode,
    WindowConfig,
};
pub use error::ConfigError;
