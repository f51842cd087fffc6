//! Contains error type for handling I/O and Errno errors
use std::error;
use std::fmt;
use std::io;

/// The error type for all failures that can arise while driving the
/// terminal: I/O errors, termios errors on unix, and the kind-tagged
/// conditions of the toolkit itself.
///
/// `Interrupted` and `Exit` are the clean-stop kinds: a binding or hook may
/// return one of them to terminate the read loop, and an application scope
/// swallows them by default (see [`crate::app::SafeExits`]). Every other
/// kind propagates to the caller after the tty has been restored.
#[derive(Debug)]
#[non_exhaustive]
pub enum TermError {
    /// I/O Error
    Io(io::Error),
    /// Unix Error from syscall
    #[cfg(unix)]
    Errno(nix::Error),
    /// Ctrl-C equivalent raised inside the read loop
    Interrupted,
    /// Orderly-shutdown request raised inside the read loop
    Exit,
    /// stdin was closed while keyboard input was required
    ClosedStdin,
    /// stdin is a pipe, keyboard input is unavailable
    PipedStdin,
    /// another live recorder already holds the tty in raw mode
    RecorderConflict,
    /// a recorder still in raw mode cannot be replaced
    UnterminatedRecorder,
    /// a menu item with no selector and no action was resolved
    MenuContract,
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TermError::Io(ref err) => err.fmt(f),
            #[cfg(unix)]
            TermError::Errno(ref err) => err.fmt(f),
            TermError::Interrupted => write!(f, "Interrupted"),
            TermError::Exit => write!(f, "Exit"),
            TermError::ClosedStdin => write!(f, "stdin is closed"),
            TermError::PipedStdin => {
                write!(f, "cannot read keyboard input from stdin when piped")
            }
            TermError::RecorderConflict => write!(f, "conflicting terminal recorders"),
            TermError::UnterminatedRecorder => write!(f, "unterminated recorder"),
            TermError::MenuContract => {
                write!(f, "menu item has no selector and is not invocable")
            }
        }
    }
}

impl error::Error for TermError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            TermError::Io(ref err) => Some(err),
            #[cfg(unix)]
            TermError::Errno(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TermError {
    fn from(err: io::Error) -> Self {
        TermError::Io(err)
    }
}

#[cfg(unix)]
impl From<nix::Error> for TermError {
    fn from(err: nix::Error) -> Self {
        TermError::Errno(err)
    }
}
