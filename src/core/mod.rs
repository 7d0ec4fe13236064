//=========================================================================
// Core Systems
//=========================================================================
//
// Everything the game controller touches, independent of the window:
//
//   game     : GameController: registration, launch, frame dispatch
//   screen   : Screen / Transition traits, lifecycle flags, contexts
//   asset    : descriptors, per-screen asset registry, AssetManager seam
//   checks   : switchable precondition checks
//   library  : long-lived user contents
//
//=========================================================================

pub mod asset;
pub mod checks;
pub mod game;
pub mod library;
pub mod screen;

pub use checks::DebugChecks;
pub use game::GameController;
