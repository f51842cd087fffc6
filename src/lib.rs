//! Xtermkit, a toolkit for full-screen interactive terminal applications
//! built on XTerm-compatible escape sequences.
//!
//! The pieces, bottom up:
//!
//! - [`Key`]: named key symbols with their raw byte-sequence aliases.
//! - [`CursorList`]: an ordered sequence with a wrapping or clamping cursor.
//! - [`Recorder`]: raw-mode stdin loop dispatching bursts through bindings
//!   and hooks.
//! - [`XtermApp`] / [`Screen`]: scoped terminal-mode switching with a
//!   context-guarded output sink and deterministic restore on every exit
//!   path.
//! - [`LineBuffer`]: a single-line editor with prompt, history and
//!   width-aware redraw.
//! - [`Menu`] and [`FuzzyFinder`]: reference applications built on the
//!   primitives above.
//!
//! # Example
//!
//! ```no_run
//! use xtermkit::{FuzzyFinder, Result};
//!
//! fn main() -> Result<()> {
//!     let mut finder = FuzzyFinder::new(["alpha", "beta", "gamma"]);
//!     if let Some(choice) = finder.run()? {
//!         println!("{choice}");
//!     }
//!     Ok(())
//! }
//! ```
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod cursor_list;
pub mod error;
pub mod finder;
pub mod keys;
pub mod line_buffer;
pub mod menu;
pub mod recorder;
pub mod text;
mod tty;

#[cfg(test)]
mod test;

pub use crate::app::{SafeExits, Screen, XtermApp, XtermConfig};
pub use crate::cursor_list::CursorList;
pub use crate::error::TermError;
pub use crate::finder::{FinderState, FuzzyFinder};
pub use crate::keys::Key;
pub use crate::line_buffer::LineBuffer;
pub use crate::menu::{Menu, MenuEntry, MenuLevel, MenuState, Orientation};
pub use crate::recorder::{Action, Bindable, Hook, Recorder, RecorderHandle};

/// The result of a terminal operation.
pub type Result<T> = std::result::Result<T, TermError>;
