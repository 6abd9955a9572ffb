// Library crate: scene model, history, geometry, viewport logic and sync.
// Hosts (the CLI binary, the wasm bindings) drive it through `Editor`.

pub mod build;
pub mod clock;
pub mod command;
pub mod csg;
pub mod editor;
pub mod fixtures;
pub mod helpers;
pub mod io;
pub mod state;
pub mod sync;
pub mod validation;
pub mod viewport;

pub use editor::{Editor, Modifiers, Notice, NoticeLevel};
