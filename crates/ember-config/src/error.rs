//! Errors from loading, saving and checking an Ember config.

use std::path::PathBuf;

/// Why a config could not be loaded, saved or accepted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config directory or file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `config.ron` is not valid RON for [`Config`](crate::Config).
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    /// The config could not be rendered as RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// The OS did not expose a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    /// A dissolve, bloom or window value outside what the renderer accepts.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// `scene.environment_dir` names something that is not a directory.
    #[error("environment directory {0} does not exist")]
    MissingEnvironmentDir(PathBuf),

    /// `scene.mesh_path` names something that is not a file.
    #[error("mesh file {0} does not exist")]
    MissingMesh(PathBuf),
}
