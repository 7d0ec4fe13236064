//=========================================================================
// Stagehand Engine
//
// Main entry point: configures and runs a game on a winit window.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──init()──>  Engine  ──run()──>  [Platform]
//         │                                                          │
//         ├─ with_title() / with_size()                              ├─ creates window
//         ├─ with_debug_checks()                                     ├─ GameController::create
//         ├─ with_asset_root() / with_loader_threads()               └─ blocks until exit
//         └─ from_config()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::PathBuf;

use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::config::EngineConfig;
use crate::core::asset::{AssetManager, FileAssetManager};
use crate::core::checks::DebugChecks;
use crate::core::game::GameController;
use crate::error::{GameError, PlatformError};
use crate::platform::{InitFn, Platform, WindowSettings};

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **Title**: "Stagehand"
/// - **Size**: 800×600
/// - **Debug checks**: on
/// - **Asset root**: "assets"
/// - **Loader threads**: 2
///
/// # Examples
///
/// ```no_run
/// use stagehand::prelude::*;
///
/// #[derive(Default)]
/// struct Title;
/// impl Screen for Title {}
///
/// #[derive(Default)]
/// struct Cut;
/// impl Transition for Cut {}
///
/// EngineBuilder::new()
///     .with_title("Demo")
///     .with_size(1280, 720)
///     .build()
///     .init(|game| {
///         game.register_screen("title", Title::default)?;
///         game.register_transition("cut", Cut::default)
///     })
///     .run()
///     .unwrap();
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    asset_manager: Option<Box<dyn AssetManager>>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// Starts from loaded configuration instead of the defaults.
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            asset_manager: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Sets the initial logical window size.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        assert!(
            width > 0 && height > 0,
            "Window size must be positive, got {}x{}",
            width,
            height
        );
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Turns guard checks on or off. Structural checks always apply.
    pub fn with_debug_checks(mut self, enabled: bool) -> Self {
        self.config.debug_checks = enabled;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.asset_root = root.into();
        self
    }

    /// Sets the number of background asset loader threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn with_loader_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Loader thread count must be positive");
        self.config.loader_threads = threads;
        self
    }

    /// Replaces the built-in file asset manager.
    ///
    /// The asset root and loader thread settings are then unused.
    pub fn with_asset_manager(mut self, manager: impl AssetManager + 'static) -> Self {
        self.asset_manager = Some(Box::new(manager));
        self
    }

    /// Builds the engine instance.
    ///
    /// Call [`Engine::init`] to register screens before [`Engine::run`].
    pub fn build(self) -> Engine {
        info!(
            "Building engine ({}, {}x{}, checks: {})",
            self.config.title, self.config.width, self.config.height, self.config.debug_checks
        );

        let manager = match self.asset_manager {
            Some(manager) => manager,
            None => Box::new(FileAssetManager::new(
                &self.config.asset_root,
                self.config.loader_threads,
            )),
        };

        Engine {
            game: GameController::new(manager, DebugChecks::new(self.config.debug_checks)),
            init: None,
            settings: WindowSettings {
                title: self.config.title,
                width: self.config.width,
                height: self.config.height,
            },
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Stagehand runtime.
///
/// Create via [`EngineBuilder`] with `EngineBuilder::new().build()`.
///
/// # Architecture
///
/// ```text
/// Engine (Main Thread)
///   └─► Platform (Event Loop)
///         ├─► Window
///         └─► GameController
///               ├─► Screens / Transitions
///               └─► AssetManager (loader threads)
/// ```
pub struct Engine {
    game: GameController,
    init: Option<InitFn>,
    settings: WindowSettings,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Sets the initializer that registers screens, transitions and
    /// assets.
    ///
    /// It runs once the window exists, as the first step of
    /// [`GameController::create`]. At least one screen and one
    /// transition must be registered; the first of each are launched.
    pub fn init<F>(mut self, init_fn: F) -> Self
    where
        F: FnOnce(&mut GameController) -> Result<(), GameError> + 'static,
    {
        self.init = Some(Box::new(init_fn));
        self
    }

    /// Registers a closure that runs after the game is disposed.
    pub fn on_teardown(mut self, teardown: impl FnOnce() + 'static) -> Self {
        self.game.on_teardown(teardown);
        self
    }

    //--- Execution --------------------------------------------------------

    /// Opens the window and blocks until the application exits.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot run. Game
    /// errors are logged and end the loop.
    pub fn run(self) -> Result<(), PlatformError> {
        info!("Starting engine runtime");

        let init = self.init.unwrap_or_else(|| {
            error!("Engine::run called without init; nothing to launch");
            Box::new(|_| Ok(()))
        });

        let platform = Platform::new(self.game, init, self.settings);
        info!("Platform initialized, entering event loop");

        let result = platform.run();
        if let Err(e) = &result {
            error!("Platform error: {}", e);
        }

        info!("Engine shutdown complete");
        result
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualAssets;

    //=====================================================================
    // EngineBuilder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.config, EngineConfig::default());
        assert!(builder.asset_manager.is_none());
    }

    #[test]
    fn builder_fluent_api_chaining() {
        let builder = EngineBuilder::new()
            .with_title("Demo")
            .with_size(1280, 720)
            .with_debug_checks(false)
            .with_asset_root("data")
            .with_loader_threads(4);

        assert_eq!(builder.config.title, "Demo");
        assert_eq!((builder.config.width, builder.config.height), (1280, 720));
        assert!(!builder.config.debug_checks);
        assert_eq!(builder.config.asset_root, PathBuf::from("data"));
        assert_eq!(builder.config.loader_threads, 4);
    }

    #[test]
    #[should_panic(expected = "Window size must be positive")]
    fn builder_with_size_panics_on_zero() {
        EngineBuilder::new().with_size(0, 600);
    }

    #[test]
    #[should_panic(expected = "Loader thread count must be positive")]
    fn builder_with_loader_threads_panics_on_zero() {
        EngineBuilder::new().with_loader_threads(0);
    }

    #[test]
    fn builder_from_config() {
        let config = EngineConfig {
            title: "Configured".into(),
            ..EngineConfig::default()
        };
        let builder = EngineBuilder::from_config(config.clone());
        assert_eq!(builder.config, config);
    }

    #[test]
    fn build_applies_settings() {
        let engine = EngineBuilder::new()
            .with_title("Demo")
            .with_size(640, 480)
            .with_debug_checks(false)
            .with_asset_manager(ManualAssets::new())
            .build();

        assert_eq!(engine.settings.title, "Demo");
        assert_eq!((engine.settings.width, engine.settings.height), (640, 480));
        assert!(!engine.game.checks().is_enabled());
        assert!(engine.init.is_none());
    }

    #[test]
    fn init_stores_initializer() {
        let engine = EngineBuilder::new()
            .with_asset_manager(ManualAssets::new())
            .build()
            .init(|_| Ok(()));

        assert!(engine.init.is_some());
    }
}
