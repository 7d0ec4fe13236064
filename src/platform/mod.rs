//=========================================================================
// Platform Subsystem
//
// Bridges Winit (OS-level events) with the game controller.
//
// Architecture:
// ```text
//  Main Thread:
//  ┌────────────────────────────┐
//  │  Winit Event Loop          │
//  │   ↓                        │
//  │  HostEvent (mapped)        │
//  │   ↓                        │
//  │  Platform::handle()        │
//  │   ├─ Started   → create    │
//  │   ├─ Redraw    → render    │
//  │   ├─ Resized   → resize    │
//  │   ├─ Focus/Suspend → pause │
//  │   └─ Close     → dispose   │
//  │   ↓                        │
//  │  GameController            │
//  └────────────────────────────┘
// ```
//
// Key Design Decisions:
// - **RedrawRequested = frame boundary**: one `render` per redraw, with
//   the delta measured from the previous redraw
// - **Window first, game second**: the game is created on the first
//   `resumed`, once the window exists and its size is known
// - **Any controller error is fatal**: logged, the game is disposed and
//   the loop exits
// - **Main thread requirement**: Winit mandates main thread on macOS/iOS,
//   so this runs on the thread that called `Engine::run()`
//
//=========================================================================

//=== External Crates =====================================================

use std::time::Instant;

use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::core::game::GameController;
use crate::error::{GameError, PlatformError};

//=== Types ===============================================================

/// User initializer run inside [`GameController::create`].
pub(crate) type InitFn = Box<dyn FnOnce(&mut GameController) -> Result<(), GameError>>;

/// Title and initial logical size of the game window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Host events the platform forwards to the game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum HostEvent {
    /// Window exists with the given physical size; the game starts.
    Started { width: u32, height: u32 },
    Resumed,
    Suspended,
    Focused(bool),
    Resized { width: u32, height: u32 },
    Redraw,
    CloseRequested,
}

/// Whether the event loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

//=== Platform ============================================================

/// Window owner and driver of the game controller.
///
/// # Lifecycle
///
/// 1. **Construction**: `Platform::new(game, init, settings)`
/// 2. **Execution**: `platform.run()` - starts event loop
/// 3. **Startup**: first `resumed()` creates the window and the game
/// 4. **Shutdown**: close or controller error → dispose → exit
///
/// # Thread Safety
///
/// This type is NOT Send/Sync - it must remain on the main thread.
pub(crate) struct Platform {
    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,

    game: GameController,

    /// Taken on startup.
    init: Option<InitFn>,

    settings: WindowSettings,

    /// Time of the previous redraw, for frame deltas.
    last_frame: Option<Instant>,
}

impl Platform {
    //--- Construction -----------------------------------------------------

    /// Does not create window yet - that happens lazily in `resumed()`.
    pub fn new(game: GameController, init: InitFn, settings: WindowSettings) -> Self {
        info!(target: "platform", "Platform subsystem initialized");

        Self {
            window: None,
            game,
            init: Some(init),
            settings,
            last_frame: None,
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the event loop until the window closes or the game fails.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// fails while running.
    ///
    /// # Panics
    ///
    /// Panics if called off the main thread (macOS/iOS Winit requirement).
    pub fn run(mut self) -> Result<(), PlatformError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop = EventLoop::new().map_err(PlatformError::EventLoopCreation)?;

        event_loop
            .run_app(&mut self)
            .map_err(PlatformError::EventLoopExecution)?;

        // Loop left without a close request (e.g. OS teardown).
        if !self.game.is_disposed() {
            self.game.dispose();
        }
        Ok(())
    }

    //--- Event Handling ---------------------------------------------------

    /// Forwards one host event to the game.
    pub(crate) fn handle(&mut self, event: HostEvent) -> LoopControl {
        if self.game.is_disposed() {
            return LoopControl::Exit;
        }

        let result = match event {
            HostEvent::Started { width, height } => self.start(width, height),
            HostEvent::Resumed | HostEvent::Focused(true) => self.game.resume(),
            HostEvent::Suspended | HostEvent::Focused(false) => self.game.pause(),
            HostEvent::Resized { width, height } => self.game.resize(width, height),
            HostEvent::Redraw => {
                let now = Instant::now();
                let delta = self
                    .last_frame
                    .map(|last| now.duration_since(last).as_secs_f32())
                    .unwrap_or(0.0);
                self.last_frame = Some(now);
                self.game.render(delta)
            }
            HostEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.game.dispose();
                return LoopControl::Exit;
            }
        };

        match result {
            Ok(()) => LoopControl::Continue,
            Err(e) => {
                error!(target: "platform", "Game failed: {}", e);
                self.game.dispose();
                LoopControl::Exit
            }
        }
    }

    fn start(&mut self, width: u32, height: u32) -> Result<(), GameError> {
        let init = self
            .game
            .checks()
            .require("game is started once", self.init.take())?;
        self.game.create(init)?;
        self.game.resize(width, height)
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn game(&self) -> &GameController {
        &self.game
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform {
    /// Called when app becomes active (startup or mobile resume).
    ///
    /// Creates the window and starts the game the first time; later calls
    /// resume the game.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "platform", "Window already exists, resuming");
            if self.handle(HostEvent::Resumed) == LoopControl::Exit {
                event_loop.exit();
            }
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.settings.title.clone())
            .with_inner_size(LogicalSize::new(self.settings.width, self.settings.height));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                let size = window.inner_size();
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    size.width,
                    size.height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);

                let started = HostEvent::Started {
                    width: size.width,
                    height: size.height,
                };
                if self.handle(started) == LoopControl::Exit {
                    event_loop.exit();
                }
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, event_loop: &ActiveEventLoop) {
        if self.handle(HostEvent::Suspended) == LoopControl::Exit {
            event_loop.exit();
        }
    }

    /// Handles per-window events.
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let host_event = match event {
            WindowEvent::CloseRequested => HostEvent::CloseRequested,
            WindowEvent::Resized(size) => HostEvent::Resized {
                width: size.width,
                height: size.height,
            },
            WindowEvent::Focused(focused) => HostEvent::Focused(focused),
            WindowEvent::RedrawRequested => HostEvent::Redraw,
            _ => return,
        };

        match self.handle(host_event) {
            LoopControl::Exit => event_loop.exit(),
            LoopControl::Continue => {
                if host_event == HostEvent::Redraw {
                    // Request next frame
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
