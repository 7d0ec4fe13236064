//=========================================================================
// Game State
//=========================================================================
//
// Everything the controller owns, minus the user teardown hook.
//
// Screen callbacks receive a context that borrows this state mutably
// while the called screen's own box is lent out of its entry. This lets
// a screen launch a transition, or a transition hide the outgoing
// screen, without aliasing the screen that is currently executing.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{Any, TypeId};

use log::{debug, error, trace};

//=== Internal Dependencies ===============================================

use crate::core::asset::{AssetManager, AssetRegistry};
use crate::core::checks::DebugChecks;
use crate::core::library::Library;
use crate::core::screen::{
    ActiveScreen, BlankScreen, Entry, HandOff, LifecyclePhase, Registry, Screen, ScreenContext,
    ScreenSlot, Transition, TransitionContext, Viewport,
};
use crate::error::GameError;

//=== Callback ============================================================

/// A host frame callback on its way to a screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Callback {
    Render(f32),
    Resize(u32, u32),
    Pause,
    Resume,
}

impl Callback {
    pub(crate) fn phase(self) -> LifecyclePhase {
        match self {
            Self::Render(_) => LifecyclePhase::Rendering,
            Self::Resize(..) => LifecyclePhase::Resizing,
            Self::Pause => LifecyclePhase::Pausing,
            Self::Resume => LifecyclePhase::Resuming,
        }
    }
}

//=== GameState ===========================================================

pub(crate) struct GameState {
    pub(crate) screens: Registry<dyn Screen>,
    pub(crate) blank: Entry<dyn Screen>,
    pub(crate) transitions: Registry<dyn Transition, HandOff>,
    pub(crate) assets: AssetRegistry,
    pub(crate) manager: Box<dyn AssetManager>,
    pub(crate) library: Library,
    pub(crate) active: ActiveScreen,
    pub(crate) phase: LifecyclePhase,
    pub(crate) viewport: Viewport,
    pub(crate) checks: DebugChecks,
    pub(crate) fault: Option<GameError>,
}

impl GameState {
    pub(crate) fn new(manager: Box<dyn AssetManager>, checks: DebugChecks) -> Self {
        Self {
            screens: Registry::new(),
            blank: Entry::new(Box::new(BlankScreen), TypeId::of::<BlankScreen>()),
            transitions: Registry::new(),
            assets: AssetRegistry::new(),
            manager,
            library: Library::new(checks),
            active: ActiveScreen::Screen(ScreenSlot::Blank),
            phase: LifecyclePhase::Initializing,
            viewport: Viewport::default(),
            checks,
            fault: None,
        }
    }

    //--- Lookup -----------------------------------------------------------

    pub(crate) fn screen_entry(&self, slot: &ScreenSlot) -> Option<&Entry<dyn Screen>> {
        match slot {
            ScreenSlot::Blank => Some(&self.blank),
            ScreenSlot::Named(name) => self.screens.get(name),
        }
    }

    pub(crate) fn screen_entry_mut(&mut self, slot: &ScreenSlot) -> Option<&mut Entry<dyn Screen>> {
        match slot {
            ScreenSlot::Blank => Some(&mut self.blank),
            ScreenSlot::Named(name) => self.screens.get_mut(name),
        }
    }

    /// Asset refs of a screen, cloned so the caller may mutate assets.
    pub(crate) fn screen_assets(&self, slot: &ScreenSlot) -> Vec<String> {
        self.screen_entry(slot)
            .map(|e| e.asset_refs.clone())
            .unwrap_or_default()
    }

    pub(crate) fn transition_assets(&self, name: &str) -> Vec<String> {
        self.transitions
            .get(name)
            .map(|e| e.asset_refs.clone())
            .unwrap_or_default()
    }

    pub(crate) fn screen_progress(&self, slot: &ScreenSlot) -> f32 {
        let refs = self.screen_entry(slot).map(|e| e.asset_refs.as_slice()).unwrap_or(&[]);
        self.assets.progress(refs, self.manager.as_ref())
    }

    pub(crate) fn transition_progress(&self, name: &str) -> f32 {
        let refs = self.transitions.get(name).map(|e| e.asset_refs.as_slice()).unwrap_or(&[]);
        self.assets.progress(refs, self.manager.as_ref())
    }

    /// Returns the asset registered as `reference`, typed as `T`.
    pub(crate) fn typed_asset<T: Any>(&self, reference: &str) -> Result<&T, GameError> {
        let handle = self
            .checks
            .require("asset ref exists", self.assets.get(reference))?;
        let asset = self.checks.require(
            "asset is loaded",
            self.manager.get(handle.descriptor().file_name()),
        )?;
        asset.downcast_ref::<T>().ok_or_else(|| GameError::AssetType {
            reference: reference.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Turns guard checks on or off for the controller and its library.
    pub(crate) fn set_checks_enabled(&mut self, enabled: bool) {
        self.checks.set_enabled(enabled);
        self.library.set_checks_enabled(enabled);
    }

    /// The first requested asset whose load failed, as an error.
    pub(crate) fn asset_failure(&self) -> Option<GameError> {
        let (reference, file_name, reason) = self.assets.first_failure(self.manager.as_ref())?;
        Some(GameError::AssetLoad {
            reference: reference.to_string(),
            file_name: file_name.to_string(),
            reason,
        })
    }

    //--- Faults -----------------------------------------------------------

    /// Records a failure raised inside a screen callback. The first one
    /// wins; the controller returns it once the callback is over.
    pub(crate) fn fail(&mut self, err: GameError) {
        error!(target: "stagehand::game", "{}", err);
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }

    pub(crate) fn take_fault(&mut self) -> Result<(), GameError> {
        match self.fault.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub(crate) fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    //--- Lending ----------------------------------------------------------

    /// Lends a screen out of its entry for the duration of `f`.
    ///
    /// Returns `None` if the slot does not exist or the screen is
    /// already lent out (re-entrant dispatch).
    pub(crate) fn with_screen<R>(
        &mut self,
        slot: &ScreenSlot,
        f: impl FnOnce(&mut dyn Screen, &mut ScreenContext<'_>) -> R,
    ) -> Option<R> {
        let mut screen = self.screen_entry_mut(slot)?.screen.take()?;
        let result = {
            let mut ctx = ScreenContext::new(self, slot.clone());
            f(screen.as_mut(), &mut ctx)
        };
        if let Some(entry) = self.screen_entry_mut(slot) {
            entry.screen = Some(screen);
        }
        Some(result)
    }

    pub(crate) fn with_transition<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn Transition, &mut TransitionContext<'_>) -> R,
    ) -> Option<R> {
        let mut transition = self.transitions.get_mut(name)?.screen.take()?;
        let result = {
            let mut ctx = TransitionContext::new(self, name.to_string());
            f(transition.as_mut(), &mut ctx)
        };
        if let Some(entry) = self.transitions.get_mut(name) {
            entry.screen = Some(transition);
        }
        Some(result)
    }

    //--- Asset Loading ----------------------------------------------------

    /// Requests a screen's assets once until they are unloaded again.
    pub(crate) fn load_screen_assets(&mut self, slot: &ScreenSlot) {
        let Self { screens, blank, assets, manager, .. } = self;
        let entry = match slot {
            ScreenSlot::Blank => Some(blank),
            ScreenSlot::Named(name) => screens.get_mut(name),
        };
        if let Some(entry) = entry {
            if !entry.flags.loaded {
                assets.load_all(&entry.asset_refs, manager.as_mut());
                entry.flags.loaded = true;
            }
        }
    }

    pub(crate) fn load_transition_assets(&mut self, name: &str) {
        let Self { transitions, assets, manager, .. } = self;
        if let Some(entry) = transitions.get_mut(name) {
            if !entry.flags.loaded {
                assets.load_all(&entry.asset_refs, manager.as_mut());
                entry.flags.loaded = true;
            }
        }
    }

    //--- Preparation ------------------------------------------------------

    /// Runs the one-time lifecycle gates of a plain screen.
    ///
    /// Requests the screen's assets if needed, then, once they are all
    /// ready, calls `create` (first time only) and `resize` + `show`
    /// (once per visibility). Returns whether the screen may receive the
    /// pending callback.
    pub(crate) fn prepare_screen(&mut self, slot: &ScreenSlot) -> bool {
        self.load_screen_assets(slot);

        if self.screen_progress(slot) < 1.0 {
            trace!(target: "stagehand::game", "{:?} is loading, callback skipped", slot);
            return false;
        }

        let Some(flags) = self.screen_entry(slot).map(|e| e.flags) else {
            return false;
        };
        let previous = self.phase;

        if !flags.created {
            self.phase = LifecyclePhase::Creating;
            self.with_screen(slot, |s, ctx| s.create(ctx));
            if let Some(entry) = self.screen_entry_mut(slot) {
                entry.flags.created = true;
            }
        }

        if !flags.showed {
            let Viewport { width, height } = self.viewport;
            self.phase = LifecyclePhase::Resizing;
            self.with_screen(slot, |s, _| s.resize(width, height));
            self.phase = LifecyclePhase::Showing;
            self.with_screen(slot, |s, ctx| s.show(ctx));
            if let Some(entry) = self.screen_entry_mut(slot) {
                entry.flags.showed = true;
            }
        }

        self.phase = previous;
        !self.has_fault()
    }

    /// Same gates as [`prepare_screen`](Self::prepare_screen) for a
    /// transition. The incoming screen's assets are requested before the
    /// transition's `show` so it can report their progress.
    pub(crate) fn prepare_transition(&mut self, name: &str) -> bool {
        self.load_transition_assets(name);

        if self.transition_progress(name) < 1.0 {
            trace!(target: "stagehand::game", "{} is loading, callback skipped", name);
            return false;
        }

        let Some(entry) = self.transitions.get(name) else {
            return false;
        };
        let flags = entry.flags;
        let incoming = entry.state.incoming.clone();
        let previous = self.phase;

        if !flags.created {
            self.phase = LifecyclePhase::Creating;
            self.with_transition(name, |t, ctx| t.create(ctx));
            if let Some(entry) = self.transitions.get_mut(name) {
                entry.flags.created = true;
            }
        }

        if !flags.showed {
            let Viewport { width, height } = self.viewport;
            self.phase = LifecyclePhase::Resizing;
            self.with_transition(name, |t, _| t.resize(width, height));
            if let Some(incoming) = incoming {
                self.load_screen_assets(&ScreenSlot::Named(incoming));
            }
            self.phase = LifecyclePhase::Showing;
            self.with_transition(name, |t, ctx| t.show(ctx));
            if let Some(entry) = self.transitions.get_mut(name) {
                entry.flags.showed = true;
            }
        }

        self.phase = previous;
        !self.has_fault()
    }

    //--- Dispatch ---------------------------------------------------------

    /// Forwards one frame callback to a plain screen once it is ready.
    /// The phase is restored when the callback returns.
    pub(crate) fn dispatch_screen(&mut self, slot: &ScreenSlot, call: Callback) {
        if !self.prepare_screen(slot) {
            return;
        }
        let previous = self.phase;
        self.phase = call.phase();
        self.with_screen(slot, |s, ctx| match call {
            Callback::Render(delta) => s.render(delta, ctx),
            Callback::Resize(width, height) => s.resize(width, height),
            Callback::Pause => s.pause(),
            Callback::Resume => s.resume(),
        });
        self.phase = previous;
    }

    /// Forwards one frame callback to a transition once it is ready.
    pub(crate) fn dispatch_transition(&mut self, name: &str, call: Callback) {
        if !self.prepare_transition(name) {
            return;
        }
        let previous = self.phase;
        self.phase = call.phase();
        self.with_transition(name, |t, ctx| match call {
            Callback::Render(delta) => t.render(delta, ctx),
            Callback::Resize(width, height) => t.resize(width, height),
            Callback::Pause => t.pause(),
            Callback::Resume => t.resume(),
        });
        self.phase = previous;
    }

    //--- Launch -----------------------------------------------------------

    /// Starts `transition` toward `screen`, replacing the active screen.
    ///
    /// The currently active plain screen becomes the outgoing screen and
    /// the incoming screen's assets start loading right away.
    pub(crate) fn launch(&mut self, transition: &str, screen: &str) -> Result<(), GameError> {
        let transition = transition.trim();
        let screen = screen.trim();

        self.checks
            .require("transition ref exists", self.transitions.contains(transition).then_some(()))?;
        self.checks
            .require("screen ref exists", self.screens.contains(screen).then_some(()))?;

        let outgoing = match &self.active {
            ActiveScreen::Screen(slot) => slot.clone(),
            ActiveScreen::Transition(_) => {
                self.checks.ensure("no transition is in progress", false)?;
                self.checks.report("launch", "ignored while a transition runs");
                return Ok(());
            }
        };

        debug!(
            target: "stagehand::game",
            "Launching {} from {:?} to {}",
            transition,
            outgoing,
            screen
        );

        if let Some(entry) = self.transitions.get_mut(transition) {
            entry.state = HandOff {
                outgoing: Some(outgoing.clone()),
                incoming: Some(screen.to_string()),
                showing: Some(outgoing),
                transferred: false,
                delivering: false,
            };
        }

        let incoming = ScreenSlot::Named(screen.to_string());
        self.load_screen_assets(&incoming);
        self.active = ActiveScreen::Transition(transition.to_string());

        let Viewport { width, height } = self.viewport;
        let previous = self.phase;
        self.phase = LifecyclePhase::Resizing;
        self.with_transition(transition, |t, _| t.resize(width, height));
        self.phase = previous;

        Ok(())
    }

    //--- Hand-off ---------------------------------------------------------

    /// Hides the outgoing screen of `transition` and unloads its assets
    /// that neither the transition nor the incoming screen use.
    ///
    /// After this the incoming screen is the one rendered beneath the
    /// transition. Runs at most once per launch.
    pub(crate) fn remove_outgoing(&mut self, transition: &str) -> Result<(), GameError> {
        self.checks.ensure_eq(
            "hand-off is requested in render",
            self.phase,
            LifecyclePhase::Rendering,
        )?;

        let hand_off = self
            .checks
            .require("transition ref exists", self.transitions.get(transition))?
            .state
            .clone();

        if hand_off.transferred {
            return Ok(());
        }

        let incoming = self
            .checks
            .require("transition has an incoming screen", hand_off.incoming)?;
        let incoming_slot = ScreenSlot::Named(incoming);

        if let Some(outgoing) = hand_off.outgoing {
            let shown = self
                .screen_entry(&outgoing)
                .map(|e| e.flags.showed)
                .unwrap_or(false);

            if shown {
                trace!(target: "stagehand::game", "Hiding outgoing {:?}", outgoing);
                self.phase = LifecyclePhase::Hiding;
                self.with_screen(&outgoing, |s, _| s.hide());
                self.phase = LifecyclePhase::Rendering;
                if let Some(entry) = self.screen_entry_mut(&outgoing) {
                    entry.flags.showed = false;
                }
            }

            let loaded = self
                .screen_entry(&outgoing)
                .map(|e| e.flags.loaded)
                .unwrap_or(false);

            if loaded {
                let hidden = self.screen_assets(&outgoing);
                let mut visible = self.transition_assets(transition);
                visible.extend(self.screen_assets(&incoming_slot));
                let keep: Vec<&String> = visible.iter().collect();
                self.assets.unload_except(&hidden, &keep, self.manager.as_mut());
                if let Some(entry) = self.screen_entry_mut(&outgoing) {
                    entry.flags.loaded = false;
                }
            }
        }

        if let Some(entry) = self.transitions.get_mut(transition) {
            entry.state.showing = Some(incoming_slot);
            entry.state.transferred = true;
        }

        Ok(())
    }

    /// Hides the transition, unloads its assets the incoming screen does
    /// not share, and makes the incoming screen active.
    ///
    /// Returns the delivered screen's slot.
    pub(crate) fn finish_hand_off(&mut self, transition: &str) -> Result<ScreenSlot, GameError> {
        let hand_off = self
            .checks
            .require("transition ref exists", self.transitions.get(transition))?
            .state
            .clone();
        let incoming = self
            .checks
            .require("transition has an incoming screen", hand_off.incoming)?;
        let incoming_slot = ScreenSlot::Named(incoming);
        let previous = self.phase;

        let shown = self
            .transitions
            .get(transition)
            .map(|e| e.flags.showed)
            .unwrap_or(false);
        if shown {
            self.phase = LifecyclePhase::Hiding;
            self.with_transition(transition, |t, _| t.hide());
        }

        let hidden = self.transition_assets(transition);
        let visible = self.screen_assets(&incoming_slot);
        let keep: Vec<&String> = visible.iter().collect();
        self.assets.unload_except(&hidden, &keep, self.manager.as_mut());

        if let Some(entry) = self.transitions.get_mut(transition) {
            entry.flags.showed = false;
            entry.flags.loaded = false;
            entry.state = HandOff::default();
        }

        debug!(target: "stagehand::game", "{} delivered {:?}", transition, incoming_slot);
        self.active = ActiveScreen::Screen(incoming_slot.clone());

        // A screen that is not shown yet is resized right before `show`.
        let shown = self
            .screen_entry(&incoming_slot)
            .is_some_and(|e| e.flags.showed);
        if shown {
            let Viewport { width, height } = self.viewport;
            self.phase = LifecyclePhase::Resizing;
            self.with_screen(&incoming_slot, |s, _| s.resize(width, height));
        }
        self.phase = previous;

        Ok(incoming_slot)
    }
}
