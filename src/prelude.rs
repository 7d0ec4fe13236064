//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use stagehand::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{GameError, StorageError};

// Game lifecycle
pub use crate::core::checks::DebugChecks;
pub use crate::core::game::GameController;
pub use crate::core::screen::{
    ActiveScreen, LifecycleFlags, LifecyclePhase, Screen, ScreenContext, ScreenSlot, Transition,
    TransitionContext, Viewport,
};

// Assets and contents
pub use crate::core::asset::{AssetDescriptor, AssetManager, FileAssetManager};
pub use crate::core::library::{Content, Library};

// Storage
pub use crate::storage::{PreferenceMapper, PreferenceStore, RecordSerializer};
