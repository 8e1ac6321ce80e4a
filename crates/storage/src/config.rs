//! Location of the annotation store
//!
//! The store directory can be set programmatically, through the
//! `PDF_INK_ANNOTATIONS_DIR` environment variable, or left at the platform
//! default.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the store directory
pub const ANNOTATIONS_DIR_ENV: &str = "PDF_INK_ANNOTATIONS_DIR";

/// Subdirectory of the data directory holding annotation files
pub const ANNOTATIONS_SUBDIR: &str = "pdf_annotations";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    EmptyValue(&'static str),
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding `<key>.xfdf` and `<key>.json` files
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: Self::default_root().unwrap_or_else(|| PathBuf::from(ANNOTATIONS_SUBDIR)) }
    }
}

impl StorageConfig {
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Platform data directory joined with [`ANNOTATIONS_SUBDIR`]
    ///
    /// - Linux: ~/.local/share/pdf-ink/pdf_annotations
    /// - macOS: ~/Library/Application Support/dev.pdf-ink.pdf-ink/pdf_annotations
    /// - Windows: %LOCALAPPDATA%\pdf-ink\pdf-ink\data\pdf_annotations
    pub fn default_root() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("dev", "pdf-ink", "pdf-ink")?;
        Some(dirs.data_local_dir().join(ANNOTATIONS_SUBDIR))
    }

    /// Defaults overridden by [`ANNOTATIONS_DIR_ENV`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ANNOTATIONS_DIR_ENV) {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue(ANNOTATIONS_DIR_ENV));
            }
            config.root = PathBuf::from(value);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_root() {
        let config = StorageConfig::with_root("/tmp/ink");
        assert_eq!(config.root, PathBuf::from("/tmp/ink"));
    }

    #[test]
    fn test_default_root_ends_with_subdir() {
        let config = StorageConfig::default();
        assert!(config.root.ends_with(ANNOTATIONS_SUBDIR));
    }
}
