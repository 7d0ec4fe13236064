//=========================================================================
// Engine Configuration
//=========================================================================
//
// Optional TOML file mirroring the `EngineBuilder` settings.
//
// Example `stagehand.toml`:
// ```toml
// title = "My Game"
// width = 1280
// height = 720
// debug_checks = false
// asset_root = "data"
// loader_threads = 4
// ```
//
// Every key is optional; missing keys keep their defaults.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

//=== Internal Dependencies ===============================================

use crate::error::StorageError;

//=== EngineConfig ========================================================

/// Window, check and asset-loading settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,

    /// Whether guard checks fail operations. See [`DebugChecks`](crate::core::checks::DebugChecks).
    pub debug_checks: bool,

    /// Directory the file asset manager resolves asset names against.
    pub asset_root: PathBuf,

    /// Background asset loader threads.
    pub loader_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Stagehand".to_string(),
            width: 800,
            height: 600,
            debug_checks: true,
            asset_root: PathBuf::from("assets"),
            loader_threads: 2,
        }
    }
}

impl EngineConfig {
    /// Reads the configuration at `path`.
    ///
    /// A missing file yields the defaults. A file that is not valid TOML
    /// is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    target: "stagehand::storage",
                    "Config {} not found, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config = Self::parse(&text)?;
        info!(target: "stagehand::storage", "Loaded config {}", path.display());
        Ok(config)
    }

    /// Parses configuration text.
    ///
    /// Zero window dimensions or a zero loader thread count are rejected
    /// as [`StorageError::Format`].
    pub fn parse(text: &str) -> Result<Self, StorageError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StorageError> {
        if self.width == 0 || self.height == 0 {
            return Err(StorageError::format(format!(
                "window size is positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.loader_threads == 0 {
            return Err(StorageError::format("loader_threads is positive"));
        }
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.title, "Stagehand");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.debug_checks);
        assert_eq!(config.asset_root, PathBuf::from("assets"));
        assert_eq!(config.loader_threads, 2);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = EngineConfig::parse("title = \"Demo\"\nloader_threads = 4\n").unwrap();
        assert_eq!(config.title, "Demo");
        assert_eq!(config.loader_threads, 4);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = EngineConfig::parse("width = \"wide\"").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }

    #[test]
    fn zero_sizes_and_threads_are_rejected() {
        for text in ["loader_threads = 0", "width = 0", "height = 0"] {
            let err = EngineConfig::parse(text).unwrap_err();
            assert!(matches!(err, StorageError::Format { .. }), "{}", text);
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("stagehand-no-such-config.toml");
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "stagehand-config-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "width = 1024\nheight = 768\ndebug_checks = false\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!((config.width, config.height), (1024, 768));
        assert!(!config.debug_checks);
    }
}
