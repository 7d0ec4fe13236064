//=========================================================================
// Screen System
//=========================================================================
//
// Screen and transition capabilities plus the bookkeeping types the
// game controller keeps for them.
//
// Architecture:
//   GameController
//     ├─ screens:     Registry<dyn Screen>
//     ├─ transitions: Registry<dyn Transition, HandOff>
//     └─ active:      ActiveScreen (Screen(slot) | Transition(ref))
//
// Flow (one frame, transition active):
//   render(showing screen) → render(transition) → [hand-off] → render(new)
//
//=========================================================================

//=== Module Declarations =================================================

mod context;
mod registry;

//=== Public API ==========================================================

pub use context::{ScreenContext, TransitionContext};
pub(crate) use registry::{Entry, HandOff, Registry};

//=== LifecyclePhase ======================================================

/// Which controller callback is currently executing.
///
/// Used only to validate that operations run where they are allowed,
/// e.g. registration during initialization and `launch` during render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Initializing,
    /// Between host callbacks, once the first render has started.
    Idle,
    Creating,
    Showing,
    Rendering,
    Pausing,
    Resuming,
    Resizing,
    Hiding,
    Disposing,
    Deinitializing,
}

//=== LifecycleFlags ======================================================

/// One-time lifecycle gates the controller keeps per screen.
///
/// - `created`: `create` ran; never reset.
/// - `showed`: `show` ran since the last `hide`.
/// - `loaded`: the screen's assets were requested since the last unload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    pub created: bool,
    pub showed: bool,
    pub loaded: bool,
}

//=== ScreenSlot ==========================================================

/// Addresses a plain screen: the built-in blank screen that is active
/// before the first launch, or a registered screen by ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenSlot {
    Blank,
    Named(String),
}

impl ScreenSlot {
    /// The registered ref, or `None` for the blank screen.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Named(name) => Some(name),
        }
    }
}

//=== ActiveScreen ========================================================

/// What the controller currently dispatches frame callbacks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveScreen {
    /// A plain screen receives callbacks directly.
    Screen(ScreenSlot),

    /// A transition is running; its showing screen is dispatched first.
    Transition(String),
}

impl ActiveScreen {
    /// Ref of the active screen or transition (`None` while blank).
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Screen(slot) => slot.reference(),
            Self::Transition(name) => Some(name),
        }
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition(_))
    }
}

//=== Viewport ============================================================

/// Current drawable size reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

//=== Screen Trait ========================================================

/// One full-scene unit of the application.
///
/// Screens are registered once through a factory and owned by the game
/// controller for the application's lifetime. Every hook has an empty
/// default, so a screen overrides only what it needs.
///
/// The controller guarantees:
/// - `create` runs exactly once, the first time the screen's assets are
///   all loaded.
/// - `resize` then `show` run once each time the screen becomes visible.
/// - `render`, `pause` and `resume` are skipped while assets load.
/// - `dispose` runs exactly once when the game is disposed.
///
/// # Example
///
/// ```rust
/// use stagehand::prelude::*;
///
/// #[derive(Default)]
/// struct Menu {
///     elapsed: f32,
/// }
///
/// impl Screen for Menu {
///     fn render(&mut self, delta: f32, ctx: &mut ScreenContext<'_>) {
///         self.elapsed += delta;
///         if self.elapsed > 3.0 {
///             ctx.launch("fade", "level");
///         }
///     }
/// }
/// ```
pub trait Screen: 'static {
    /// One-time initialization; state set here lives until dispose.
    fn create(&mut self, _ctx: &mut ScreenContext<'_>) {}

    /// Called when the screen becomes visible.
    fn show(&mut self, _ctx: &mut ScreenContext<'_>) {}

    /// Called every frame while the screen is visible and loaded.
    fn render(&mut self, _delta: f32, _ctx: &mut ScreenContext<'_>) {}

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    /// Called when a transition removes the screen from view.
    fn hide(&mut self) {}

    fn dispose(&mut self) {}
}

//=== Transition Trait ====================================================

/// A screen that hands the view over from an outgoing screen to an
/// incoming one.
///
/// The default `render` switches immediately, so a transition with no
/// overrides is instant. Override `render` to stage an effect across
/// several frames, calling [`TransitionContext::switch_screens`] when
/// done.
///
/// # Example
///
/// ```rust
/// use stagehand::prelude::*;
///
/// #[derive(Default)]
/// struct LoadingBar;
///
/// impl Transition for LoadingBar {
///     fn render(&mut self, _delta: f32, ctx: &mut TransitionContext<'_>) {
///         if ctx.incoming_progress() >= 1.0 {
///             ctx.switch_screens();
///         }
///     }
/// }
/// ```
pub trait Transition: 'static {
    fn create(&mut self, _ctx: &mut TransitionContext<'_>) {}

    fn show(&mut self, _ctx: &mut TransitionContext<'_>) {}

    /// Called every frame while the transition is active and loaded.
    fn render(&mut self, _delta: f32, ctx: &mut TransitionContext<'_>) {
        ctx.switch_screens();
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn hide(&mut self) {}

    fn dispose(&mut self) {}
}

//=== BlankScreen =========================================================

/// Placeholder screen that is active until the first transition
/// delivers a registered screen.
pub(crate) struct BlankScreen;

impl Screen for BlankScreen {}

//=========================================================================
// Unit Tests
//=========================================================================
