//=========================================================================
// Stagehand Library Root
//
// Screen, transition and asset lifecycle bookkeeping for frame-driven
// games, plus small persistence helpers.
//
// Responsibilities:
// - Expose the game controller and the screen/transition traits (`core`)
// - Map settings records onto preference stores and save record lists
//   (`storage`)
// - Run a controller on a winit window (`Engine`), keeping the platform
//   layer private
//
// Typical usage:
// ```no_run
// use stagehand::prelude::*;
//
// #[derive(Default)]
// struct Title;
// impl Screen for Title {}
//
// #[derive(Default)]
// struct Cut;
// impl Transition for Cut {}
//
// fn main() {
//     stagehand::logger::init(log::LevelFilter::Info);
//     EngineBuilder::new()
//         .build()
//         .init(|game| {
//             game.register_screen("title", Title::default)?;
//             game.register_transition("cut", Cut::default)
//         })
//         .run()
//         .unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the controller, screens, transitions, assets and the
// content library. `storage` holds preferences and save files.
//
pub mod config;
pub mod core;
pub mod error;
pub mod logger;
pub mod prelude;
pub mod storage;

//--- Internal Modules ----------------------------------------------------
//
// `platform` owns the winit event loop and window. `engine` is the
// builder facade that hands a configured controller to it.
//
mod engine;
mod platform;

#[cfg(test)]
mod testing;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder};
