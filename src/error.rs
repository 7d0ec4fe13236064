//=========================================================================
// Error Types
//=========================================================================
//
// Two failure classes exist in this crate:
//
// - `GameError::Check`: a violated precondition (bad ref, duplicate
//   registration, wrong lifecycle phase). These are programmer errors
//   detected by `DebugChecks` and are never retried.
// - `StorageError`: structural I/O failures while reading or writing
//   preferences, save files, or configuration.
//
// `PlatformError` covers the winit host and is fatal by nature.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::io;

//=== GameError ===========================================================

/// Errors raised by the screen, transition and asset bookkeeping layer.
#[derive(Debug)]
pub enum GameError {
    /// A precondition check failed. The tag describes the expectation
    /// that was violated, e.g. `"screen ref is unique"`.
    Check { tag: String },

    /// A registered asset was requested as a type it was not loaded as.
    AssetType {
        reference: String,
        expected: &'static str,
    },

    /// An asset requested by a screen or transition could not be loaded.
    AssetLoad {
        reference: String,
        file_name: String,
        reason: String,
    },

    /// A storage operation failed underneath a game operation.
    Storage(StorageError),
}

impl GameError {
    /// Builds a failed-check error from its descriptive tag.
    pub fn check(tag: impl Into<String>) -> Self {
        Self::Check { tag: tag.into() }
    }

    /// Returns the failed-check tag, if this is a check failure.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Check { tag } => Some(tag),
            _ => None,
        }
    }
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check { tag } => write!(f, "failed: {}", tag),
            Self::AssetType { reference, expected } => {
                write!(f, "asset '{}' is not a {}", reference, expected)
            }
            Self::AssetLoad {
                reference,
                file_name,
                reason,
            } => write!(f, "asset '{}' ({}) failed to load: {}", reference, file_name, reason),
            Self::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for GameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for GameError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

//=== StorageError ========================================================

/// Errors raised while persisting or restoring data.
#[derive(Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    Io(io::Error),

    /// A JSON payload could not be produced or parsed.
    Json(serde_json::Error),

    /// The XML container could not be produced or parsed.
    Xml(quick_xml::Error),

    /// The document parsed but does not have the expected structure.
    Format { reason: String },

    /// A configuration file is not valid TOML for the expected shape.
    Config(toml::de::Error),
}

impl StorageError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Self::Format { reason: reason.into() }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O failure: {}", e),
            Self::Json(e) => write!(f, "JSON failure: {}", e),
            Self::Xml(e) => write!(f, "XML failure: {}", e),
            Self::Format { reason } => write!(f, "malformed data: {}", reason),
            Self::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Xml(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Format { .. } => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<quick_xml::Error> for StorageError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

impl From<quick_xml::events::attributes::AttrError> for StorageError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::from(e))
    }
}

impl From<toml::de::Error> for StorageError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e)
    }
}

//=== PlatformError =======================================================

/// Platform initialization and runtime errors.
///
/// These are typically fatal - if the event loop can't be created,
/// the game cannot run.
#[derive(Debug)]
pub enum PlatformError {
    /// Failed to create event loop (rare, indicates OS-level issue).
    EventLoopCreation(winit::error::EventLoopError),

    /// Event loop execution error.
    EventLoopExecution(winit::error::EventLoopError),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventLoopCreation(e) => write!(f, "Event loop creation failed: {}", e),
            Self::EventLoopExecution(e) => write!(f, "Event loop error: {}", e),
        }
    }
}

impl std::error::Error for PlatformError {}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_error_displays_tag() {
        let err = GameError::check("screen ref exists");
        assert_eq!(err.to_string(), "failed: screen ref exists");
        assert_eq!(err.tag(), Some("screen ref exists"));
    }

    #[test]
    fn storage_error_is_source_of_game_error() {
        use std::error::Error;

        let err = GameError::from(StorageError::format("count mismatch"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("count mismatch"));
        assert_eq!(err.tag(), None);
    }

    #[test]
    fn asset_load_error_names_ref_and_file() {
        let err = GameError::AssetLoad {
            reference: "hero".into(),
            file_name: "hero.png".into(),
            reason: "not found".into(),
        };
        assert_eq!(err.to_string(), "asset 'hero' (hero.png) failed to load: not found");
        assert_eq!(err.tag(), None);
    }

    #[test]
    fn io_error_converts_into_storage_error() {
        let io = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn errors_implement_error_trait() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<GameError>();
        assert_error::<StorageError>();
        assert_error::<PlatformError>();
    }
}
