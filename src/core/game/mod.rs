//=========================================================================
// Game Controller
//=========================================================================
//
// Owns every registered screen, transition and asset, and forwards the
// host's frame callbacks to whatever is currently active.
//
// Lifecycle:
//   new() → create(init) → [render | resize | pause | resume]* → dispose()
//
// Dispatch (one host callback):
//   active = Screen(slot)      → prepare + forward to slot
//   active = Transition(name)  → prepare + forward to showing screen
//                              → prepare + forward to transition
//                              → finish hand-off if switch was requested
//
// Registration is only valid until the first render. The first render
// marks the registries as consumed.
//
//=========================================================================

//=== Module Declarations =================================================

mod state;


//=== External Dependencies ===============================================

use std::any::{Any, TypeId};

use log::{debug, error, info, trace};

//=== Internal Dependencies ===============================================

use crate::core::asset::{AssetDescriptor, AssetHandle, AssetManager};
use crate::core::checks::DebugChecks;
use crate::core::library::Library;
use crate::core::screen::{
    ActiveScreen, Entry, LifecycleFlags, LifecyclePhase, Screen, ScreenSlot, Transition,
    Viewport,
};
use crate::error::GameError;

pub(crate) use state::{Callback, GameState};

//=== GameController ======================================================

/// Screen, transition and asset bookkeeping driven by host callbacks.
///
/// # Example
///
/// ```rust
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
/// let assets = FileAssetManager::new("assets", 1);
/// let mut game = GameController::new(Box::new(assets), DebugChecks::default());
///
/// game.create(|game| {
///     game.register_screen("title", Title::default)?;
///     game.register_transition("cut", Cut::default)?;
///     Ok(())
/// })
/// .unwrap();
///
/// game.resize(800, 600).unwrap();
/// game.render(0.016).unwrap();
/// assert_eq!(game.active().reference(), Some("title"));
/// game.dispose();
/// ```
pub struct GameController {
    state: GameState,
    created: bool,
    started: bool,
    disposed: bool,
    teardown: Option<Box<dyn FnOnce()>>,
}

impl GameController {
    pub fn new(manager: Box<dyn AssetManager>, checks: DebugChecks) -> Self {
        Self {
            state: GameState::new(manager, checks),
            created: false,
            started: false,
            disposed: false,
            teardown: None,
        }
    }

    //--- Startup ----------------------------------------------------------

    /// Runs the user initializer, then launches the first registered
    /// transition toward the first registered screen.
    ///
    /// At least one screen and one transition must be registered by
    /// `init`. Registration stays open until the first render.
    pub fn create<F>(&mut self, init: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut GameController) -> Result<(), GameError>,
    {
        let checks = self.state.checks;
        checks.ensure("game is created once", !self.created)?;
        self.created = true;

        self.state.phase = LifecyclePhase::Initializing;
        init(self)?;

        let checks = self.state.checks;
        checks.ensure("registered at least one screen", self.state.screens.len() >= 1)?;
        checks.ensure("registered at least one transition", self.state.transitions.len() >= 1)?;

        let screen = checks.require("first screen", self.state.screens.first())?.to_string();
        let transition = checks
            .require("first transition", self.state.transitions.first())?
            .to_string();

        info!(
            target: "stagehand::game",
            "Created with {} screens, {} transitions, {} assets",
            self.state.screens.len(),
            self.state.transitions.len(),
            self.state.assets.len()
        );

        self.state.active = ActiveScreen::Screen(ScreenSlot::Blank);
        self.state.launch(&transition, &screen)
    }

    /// Registers a closure that runs last in [`dispose`](Self::dispose).
    pub fn on_teardown(&mut self, teardown: impl FnOnce() + 'static) {
        self.teardown = Some(Box::new(teardown));
    }

    //--- Registration -----------------------------------------------------

    /// Registers the screen built by `factory` under `reference`.
    ///
    /// The ref is trimmed and must be non-empty and unique, and no other
    /// screen of the same type may be registered.
    pub fn register_screen<T, F>(&mut self, reference: &str, factory: F) -> Result<(), GameError>
    where
        T: Screen,
        F: FnOnce() -> T,
    {
        let checks = self.registration_checks()?;
        let reference = checks.ensure_ref("screen ref is not empty", reference)?;
        checks.ensure("screen ref is unique", !self.state.screens.contains(reference))?;
        checks.ensure(
            "screen object is unique",
            !self.state.screens.contains_type(TypeId::of::<T>()),
        )?;

        debug!(target: "stagehand::game", "Registering screen {}", reference);
        let screen: Box<dyn Screen> = Box::new(factory());
        self.state
            .screens
            .insert(reference.to_string(), Entry::new(screen, TypeId::of::<T>()));
        Ok(())
    }

    /// Registers the transition built by `factory` under `reference`.
    pub fn register_transition<T, F>(
        &mut self,
        reference: &str,
        factory: F,
    ) -> Result<(), GameError>
    where
        T: Transition,
        F: FnOnce() -> T,
    {
        let checks = self.registration_checks()?;
        let reference = checks.ensure_ref("transition ref is not empty", reference)?;
        checks.ensure(
            "transition ref is unique",
            !self.state.transitions.contains(reference),
        )?;
        checks.ensure(
            "transition object is unique",
            !self.state.transitions.contains_type(TypeId::of::<T>()),
        )?;

        debug!(target: "stagehand::game", "Registering transition {}", reference);
        let transition: Box<dyn Transition> = Box::new(factory());
        self.state
            .transitions
            .insert(reference.to_string(), Entry::new(transition, TypeId::of::<T>()));
        Ok(())
    }

    /// Registers a loadable asset under `reference`.
    ///
    /// Both the ref and the descriptor must be unique, and a file may only
    /// be registered as one type.
    pub fn register_asset(
        &mut self,
        reference: &str,
        descriptor: AssetDescriptor,
    ) -> Result<(), GameError> {
        let checks = self.registration_checks()?;
        let reference = checks.ensure_ref("asset ref is not empty", reference)?;
        checks.ensure("asset ref is unique", !self.state.assets.contains(reference))?;

        let handle = AssetHandle::new(descriptor);
        checks.ensure(
            "asset object is unique",
            !self.state.assets.contains_handle(&handle),
        )?;
        checks.ensure(
            "asset file has a single type",
            !self.state.assets.contains_file(handle.descriptor().file_name()),
        )?;

        debug!(
            target: "stagehand::game",
            "Registering asset {} ({} as {})",
            reference,
            handle.descriptor().file_name(),
            handle.descriptor().type_name()
        );
        self.state.assets.insert(reference.to_string(), handle);
        Ok(())
    }

    /// Adds `asset` to the assets `screen` needs before it can run.
    pub fn attach_asset_to_screen(&mut self, screen: &str, asset: &str) -> Result<(), GameError> {
        let checks = self.registration_checks()?;
        let screen = checks.ensure_ref("screen ref is not empty", screen)?;
        let asset = checks.ensure_ref("asset ref is not empty", asset)?;
        checks.require("asset ref exists", self.state.assets.contains(asset).then_some(()))?;

        let entry = checks.require("screen ref exists", self.state.screens.get_mut(screen))?;
        attach(&checks, "screen ref gets new asset ref", &mut entry.asset_refs, asset)
    }

    /// Adds `asset` to the assets `transition` needs before it can run.
    pub fn attach_asset_to_transition(
        &mut self,
        transition: &str,
        asset: &str,
    ) -> Result<(), GameError> {
        let checks = self.registration_checks()?;
        let transition = checks.ensure_ref("transition ref is not empty", transition)?;
        let asset = checks.ensure_ref("asset ref is not empty", asset)?;
        checks.require("asset ref exists", self.state.assets.contains(asset).then_some(()))?;

        let entry = checks.require(
            "transition ref exists",
            self.state.transitions.get_mut(transition),
        )?;
        attach(&checks, "transition ref gets new asset ref", &mut entry.asset_refs, asset)
    }

    fn registration_checks(&self) -> Result<DebugChecks, GameError> {
        let checks = self.state.checks;
        checks.ensure_eq(
            "method is called in initialize",
            self.state.phase,
            LifecyclePhase::Initializing,
        )?;
        checks.ensure("registries are not consumed", !self.started)?;
        Ok(checks)
    }

    //--- Frame Callbacks --------------------------------------------------

    /// Advances asset loading and renders the active screen.
    ///
    /// Fails with [`GameError::AssetLoad`] once a requested asset could
    /// not be loaded; nothing is rendered that frame.
    pub fn render(&mut self, delta: f32) -> Result<(), GameError> {
        self.ensure_running()?;
        if !self.started {
            trace!(target: "stagehand::game", "First render, registries consumed");
            self.started = true;
            self.state.phase = LifecyclePhase::Idle;
        }

        self.state.manager.update();
        if let Some(err) = self.state.asset_failure() {
            error!(target: "stagehand::game", "{}", err);
            return Err(err);
        }
        self.dispatch(Callback::Render(delta))
    }

    /// Records the new viewport and forwards it to the active screen.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GameError> {
        self.ensure_running()?;
        self.state.viewport = Viewport::new(width, height);
        self.dispatch(Callback::Resize(width, height))
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        self.dispatch(Callback::Pause)
    }

    pub fn resume(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        self.dispatch(Callback::Resume)
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        let checks = self.state.checks;
        checks.ensure("game is created", self.created)?;
        checks.ensure("game is not disposed", !self.disposed)
    }

    fn dispatch(&mut self, call: Callback) -> Result<(), GameError> {
        let state = &mut self.state;

        match state.active.clone() {
            ActiveScreen::Screen(slot) => state.dispatch_screen(&slot, call),
            ActiveScreen::Transition(name) => {
                let showing = state
                    .transitions
                    .get(&name)
                    .and_then(|e| e.state.showing.clone());
                if let Some(showing) = showing {
                    state.dispatch_screen(&showing, call);
                }
                if !state.has_fault() {
                    state.dispatch_transition(&name, call);
                }

                let delivering = state
                    .transitions
                    .get(&name)
                    .is_some_and(|e| e.state.delivering);
                if delivering && !state.has_fault() {
                    let delivered = state.finish_hand_off(&name)?;
                    if let Callback::Render(_) = call {
                        state.dispatch_screen(&delivered, call);
                    }
                }
            }
        }

        state.take_fault()
    }

    //--- Shutdown ---------------------------------------------------------

    /// Disposes every screen and transition, then the asset manager, then
    /// runs the teardown closure. Later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            self.state.checks.report("dispose", "game is already disposed");
            return;
        }
        self.disposed = true;

        let state = &mut self.state;
        state.phase = LifecyclePhase::Disposing;

        let screens: Vec<String> = state.screens.refs().map(str::to_string).collect();
        for reference in screens {
            state.with_screen(&ScreenSlot::Named(reference), |s, _| s.dispose());
        }
        let transitions: Vec<String> = state.transitions.refs().map(str::to_string).collect();
        for reference in transitions {
            state.with_transition(&reference, |t, _| t.dispose());
        }
        state.manager.dispose();

        state.phase = LifecyclePhase::Deinitializing;
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
        info!(target: "stagehand::game", "Disposed");
    }

    //--- Queries ----------------------------------------------------------

    /// Returns the loaded asset `reference` as a `T`.
    pub fn get_asset<T: Any>(&self, reference: &str) -> Result<&T, GameError> {
        self.state.typed_asset(reference)
    }

    pub fn active(&self) -> &ActiveScreen {
        &self.state.active
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.state.phase
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn screen_flags(&self, reference: &str) -> Option<LifecycleFlags> {
        self.state.screens.get(reference).map(|e| e.flags)
    }

    pub fn transition_flags(&self, reference: &str) -> Option<LifecycleFlags> {
        self.state.transitions.get(reference).map(|e| e.flags)
    }

    /// Load progress of a registered screen's assets, in `[0, 1]`.
    pub fn screen_progress(&self, reference: &str) -> Option<f32> {
        let slot = ScreenSlot::Named(reference.to_string());
        self.state
            .screens
            .contains(reference)
            .then(|| self.state.screen_progress(&slot))
    }

    /// Long-lived user contents shared across screens.
    pub fn library(&self) -> &Library {
        &self.state.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.state.library
    }

    pub fn checks(&self) -> &DebugChecks {
        &self.state.checks
    }

    /// Turns guard checks on or off, for the library as well.
    pub fn set_checks_enabled(&mut self, enabled: bool) {
        self.state.set_checks_enabled(enabled);
    }

    pub fn asset_manager(&self) -> &dyn AssetManager {
        self.state.manager.as_ref()
    }
}

impl std::fmt::Debug for GameController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameController")
            .field("active", &self.state.active)
            .field("phase", &self.state.phase)
            .field("screens", &self.state.screens.len())
            .field("transitions", &self.state.transitions.len())
            .field("assets", &self.state.assets.len())
            .finish()
    }
}

//=== Helpers =============================================================

fn attach(
    checks: &DebugChecks,
    tag: &str,
    refs: &mut Vec<String>,
    asset: &str,
) -> Result<(), GameError> {
    let attached = refs.iter().any(|r| r == asset);
    checks.ensure(tag, !attached)?;
    if !attached {
        refs.push(asset.to_string());
    }
    Ok(())
}
