//! cf-state: Undo/redo for automation editing
//!
//! Every structural curve edit is wrapped in a reversible command.

mod commands;
mod undo;

pub use commands::*;
pub use undo::*;
