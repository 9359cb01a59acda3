//! Unified path management for iris data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/iris/              # Config directory
//! └── archive/                 # Durable chat archive
//!     └── <user_id>/
//!         └── <session_id>.toml
//! ```

use iris_core::error::{IrisError, Result};
use std::path::PathBuf;

/// Unified path resolution for iris.
pub struct IrisPaths;

impl IrisPaths {
    /// Returns the iris configuration directory (`~/.config/iris` on
    /// Linux/macOS, the platform equivalent elsewhere).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("iris"))
            .ok_or_else(|| IrisError::config("Cannot find config directory"))
    }

    /// Returns the archive base directory.
    ///
    /// Honors the `IRIS_ARCHIVE_DIR` override; defaults to
    /// `<config_dir>/archive`.
    pub fn archive_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("IRIS_ARCHIVE_DIR") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        Ok(Self::config_dir()?.join("archive"))
    }
}
