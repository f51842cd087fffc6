//! This module implements and describes common TTY methods & traits
use std::time::Duration;

use crate::Result;

/// Low-level terminal contract: raw-mode switching and burst reads.
///
/// One implementation per platform, re-exported as [`Terminal`]. The raw
/// reader model is deliberately simple: after a readiness wait, everything
/// buffered on stdin is drained into a single burst so that multi-byte
/// escape sequences arrive whole.
pub trait Term {
    fn new() -> Self
    where
        Self: Sized;
    /// check if stdin is connected to a terminal.
    fn is_stdin_tty(&self) -> bool;
    /// Enter non-canonical, non-echoing raw mode, saving the original
    /// line discipline on first entry.
    fn enable_raw_mode(&mut self) -> Result<()>;
    /// Restore the saved line discipline.
    fn disable_raw_mode(&mut self) -> Result<()>;
    /// Discard pending, unread input.
    fn flush_input(&mut self) -> Result<()>;
    /// Block until input is ready (bounded by `timeout`), then drain all
    /// buffered bytes as one burst. `None` means the timeout expired.
    fn wait_burst(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<u8>>>;
    /// Cooked line read, prompt written first.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Read exactly `max_chars` characters in non-canonical mode, prompt
    /// written first.
    fn read_chars(&mut self, prompt: &str, max_chars: usize) -> Result<String>;
}

cfg_if::cfg_if! {
    if #[cfg(test)] {
        pub use self::test::*;
    } else if #[cfg(unix)] {
        mod unix;
        pub use self::unix::*;
    } else if #[cfg(windows)] {
        mod windows;
        pub use self::windows::*;
    }
}
