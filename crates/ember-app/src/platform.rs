//! Platform directories.
//!
//! Config and log locations follow OS conventions (XDG on Linux, Known
//! Folders on Windows, Library on macOS) via `dirs`, or sit under an explicit
//! root when `--config` is given.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

const APP_NAME: &str = "ember";

/// Where Ember keeps its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Holds the JSON log of debug builds.
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// `<os config dir>/ember` without touching the disk.
    pub fn resolve() -> Result<Self, PlatformError> {
        let base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        Ok(Self::resolve_with_root(&base.join(APP_NAME)))
    }

    /// Directories rooted at `root` (the `--config` override).
    pub fn resolve_with_root(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            log_dir: root.join("logs"),
        }
    }

    /// The override when given, the OS location otherwise.
    pub fn resolve_or(root: Option<&Path>) -> Result<Self, PlatformError> {
        match root {
            Some(root) => Ok(Self::resolve_with_root(root)),
            None => Self::resolve(),
        }
    }

    /// Create the config and data directories if missing.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
