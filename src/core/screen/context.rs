//=========================================================================
// Screen Contexts
//=========================================================================
//
// Handles passed into screen and transition hooks.
//
// A context borrows the game state for the duration of one callback.
// Operations that cannot hand an error back to the host (launch,
// hand-off) record it as the frame's fault instead; the controller
// returns it once the callback is over.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;

//=== Internal Dependencies ===============================================

use super::{LifecyclePhase, ScreenSlot, Viewport};
use crate::core::checks::DebugChecks;
use crate::core::game::{Callback, GameState};
use crate::core::library::Library;
use crate::error::GameError;

//=== ScreenContext =======================================================

/// Access to the game from inside a [`Screen`](super::Screen) hook.
pub struct ScreenContext<'a> {
    core: &'a mut GameState,
    slot: ScreenSlot,
}

impl<'a> ScreenContext<'a> {
    pub(crate) fn new(core: &'a mut GameState, slot: ScreenSlot) -> Self {
        Self { core, slot }
    }

    /// Ref of the screen this context was handed to.
    pub fn reference(&self) -> Option<&str> {
        self.slot.reference()
    }

    /// Starts `transition` toward `screen`.
    ///
    /// Only valid from `render`. The calling screen becomes the
    /// transition's outgoing screen.
    pub fn launch(&mut self, transition: &str, screen: &str) {
        let result = self
            .core
            .checks
            .ensure_eq("launch is called in render", self.core.phase, LifecyclePhase::Rendering)
            .and_then(|()| self.core.launch(transition, screen));

        if let Err(err) = result {
            self.core.fail(err);
        }
    }

    /// Returns the loaded asset `reference` as a `T`.
    ///
    /// The asset must be attached to this screen.
    pub fn asset<T: Any>(&self, reference: &str) -> Result<&T, GameError> {
        let attached = self
            .core
            .screen_entry(&self.slot)
            .is_some_and(|e| e.asset_refs.iter().any(|r| r == reference));
        self.core
            .checks
            .ensure("asset is attached to the screen", attached)?;
        self.core.typed_asset(reference)
    }

    /// Load progress of this screen's assets, in `[0, 1]`.
    pub fn asset_progress(&self) -> f32 {
        self.core.screen_progress(&self.slot)
    }

    pub fn viewport(&self) -> Viewport {
        self.core.viewport
    }

    pub fn checks(&self) -> &DebugChecks {
        &self.core.checks
    }

    /// Shared content owned by the game.
    pub fn library(&self) -> &Library {
        &self.core.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.core.library
    }
}

//=== TransitionContext ===================================================

/// Access to the game from inside a [`Transition`](super::Transition)
/// hook, including control over the running hand-off.
pub struct TransitionContext<'a> {
    core: &'a mut GameState,
    name: String,
}

impl<'a> TransitionContext<'a> {
    pub(crate) fn new(core: &'a mut GameState, name: String) -> Self {
        Self { core, name }
    }

    /// Ref of the transition this context was handed to.
    pub fn reference(&self) -> &str {
        &self.name
    }

    //--- Hand-off ---------------------------------------------------------

    /// Hides the outgoing screen and unloads the assets nobody else
    /// needs. The incoming screen then renders beneath the transition.
    ///
    /// Only valid from `render`. Calling it again is a no-op.
    pub fn remove_outgoing(&mut self) {
        if let Err(err) = self.core.remove_outgoing(&self.name) {
            self.core.fail(err);
        }
    }

    /// Removes the outgoing screen, then ends the transition once the
    /// current callback returns: the transition is hidden, its unshared
    /// assets are unloaded, and the incoming screen becomes active.
    ///
    /// Only valid from `render`.
    pub fn switch_screens(&mut self) {
        if let Err(err) = self.core.remove_outgoing(&self.name) {
            self.core.fail(err);
            return;
        }
        if let Some(entry) = self.core.transitions.get_mut(&self.name) {
            entry.state.delivering = true;
        }
    }

    /// Transitions cannot launch other transitions; this only reports.
    pub fn launch(&mut self, transition: &str, screen: &str) {
        self.core.checks.report(
            "launch",
            &format!("{} cannot launch {} toward {}", self.name, transition, screen),
        );
    }

    //--- Incoming Screen --------------------------------------------------

    /// Load progress of the incoming screen's assets, in `[0, 1]`.
    pub fn incoming_progress(&self) -> f32 {
        match self.incoming() {
            Some(slot) => self.core.screen_progress(&slot),
            None => 1.0,
        }
    }

    /// Ref of the screen this transition delivers.
    pub fn incoming_ref(&self) -> Option<&str> {
        self.core
            .transitions
            .get(&self.name)
            .and_then(|e| e.state.incoming.as_deref())
    }

    fn incoming(&self) -> Option<ScreenSlot> {
        self.incoming_ref().map(|r| ScreenSlot::Named(r.to_string()))
    }

    //--- Outgoing Screen --------------------------------------------------

    /// Whether the outgoing screen is still visible.
    pub fn is_outgoing_shown(&self) -> bool {
        self.shown_outgoing().is_some()
    }

    pub fn render_outgoing(&mut self, delta: f32) {
        self.forward_outgoing("render_outgoing", Callback::Render(delta));
    }

    pub fn resize_outgoing(&mut self, width: u32, height: u32) {
        self.forward_outgoing("resize_outgoing", Callback::Resize(width, height));
    }

    pub fn pause_outgoing(&mut self) {
        self.forward_outgoing("pause_outgoing", Callback::Pause);
    }

    pub fn resume_outgoing(&mut self) {
        self.forward_outgoing("resume_outgoing", Callback::Resume);
    }

    fn shown_outgoing(&self) -> Option<ScreenSlot> {
        let hand_off = &self.core.transitions.get(&self.name)?.state;
        if hand_off.transferred {
            return None;
        }
        let outgoing = hand_off.outgoing.as_ref()?;
        let shown = self.core.screen_entry(outgoing)?.flags.showed;
        shown.then(|| outgoing.clone())
    }

    /// Forwards a callback to the outgoing screen while it is shown. The
    /// transition may hide it at any point, so later calls only report.
    fn forward_outgoing(&mut self, operation: &str, call: Callback) {
        let Some(outgoing) = self.shown_outgoing() else {
            self.core.checks.report(operation, "outgoing screen is not shown");
            return;
        };
        self.core.dispatch_screen(&outgoing, call);
    }

    //--- Queries ----------------------------------------------------------

    /// Returns the loaded asset `reference` as a `T`.
    ///
    /// The asset must be attached to this transition.
    pub fn asset<T: Any>(&self, reference: &str) -> Result<&T, GameError> {
        let attached = self
            .core
            .transitions
            .get(&self.name)
            .is_some_and(|e| e.asset_refs.iter().any(|r| r == reference));
        self.core
            .checks
            .ensure("asset is attached to the transition", attached)?;
        self.core.typed_asset(reference)
    }

    /// Load progress of this transition's own assets, in `[0, 1]`.
    pub fn asset_progress(&self) -> f32 {
        self.core.transition_progress(&self.name)
    }

    pub fn viewport(&self) -> Viewport {
        self.core.viewport
    }

    pub fn checks(&self) -> &DebugChecks {
        &self.core.checks
    }

    /// Shared content owned by the game.
    pub fn library(&self) -> &Library {
        &self.core.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.core.library
    }
}
