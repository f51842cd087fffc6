//! Unix specific definitions
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{debug, warn};
use nix::errno::Errno;
use nix::poll::{self, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{
    self, ControlFlags, FlushArg, InputFlags, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};

use super::Term;
use crate::error::TermError;
use crate::Result;

const STDIN_FILENO: libc::c_int = libc::STDIN_FILENO;

nix::ioctl_read_bad!(win_size, libc::TIOCGWINSZ, libc::winsize);

/// Columns and rows of the controlling terminal, `(80, 24)` when unknown.
pub fn window_size() -> (usize, usize) {
    use std::mem::zeroed;

    unsafe {
        let mut size: libc::winsize = zeroed();
        match win_size(libc::STDOUT_FILENO, &mut size) {
            Ok(0) if size.ws_col != 0 && size.ws_row != 0 => {
                (size.ws_col as usize, size.ws_row as usize)
            }
            _ => (80, 24),
        }
    }
}

/// Run `stty sane` to recover from a botched line discipline. Failures are
/// ignored: this is the last-resort path.
pub fn sane() {
    let _ = Command::new("stty")
        .arg("sane")
        .stderr(Stdio::null())
        .status();
}

fn stdin_is_fifo() -> bool {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    unsafe {
        libc::fstat(STDIN_FILENO, &mut st) == 0 && (st.st_mode & libc::S_IFMT) == libc::S_IFIFO
    }
}

/// Blocking read on the raw stdin fd, retrying on EINTR.
fn read_stdin(buf: &mut [u8]) -> Result<usize> {
    loop {
        let res = unsafe {
            libc::read(
                STDIN_FILENO,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len() as libc::size_t,
            )
        };
        if res == -1 {
            let error = io::Error::last_os_error();
            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error.into());
            }
        } else {
            #[allow(clippy::cast_sign_loss)]
            return Ok(res as usize);
        }
    }
}

fn poll_stdin(timeout: PollTimeout) -> Result<i32> {
    let stdin = io::stdin();
    let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
    Ok(poll::poll(&mut fds, timeout)?)
}

pub struct PosixTerm {
    original: Option<Termios>,
}

pub type Terminal = PosixTerm;

impl PosixTerm {
    fn raw_attrs(original: &Termios) -> Termios {
        let mut raw = original.clone();
        // disable BREAK interrupt, CR to NL conversion on input,
        // input parity check, strip high bit (bit 8), output flow control
        raw.input_flags &= !(InputFlags::BRKINT
            | InputFlags::ICRNL
            | InputFlags::INPCK
            | InputFlags::ISTRIP
            | InputFlags::IXON);
        // character-size mark (8 bits)
        raw.control_flags |= ControlFlags::CS8;
        // disable echoing, canonical mode, extended input processing and signals
        raw.local_flags &=
            !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        raw
    }
}

impl Term for PosixTerm {
    fn new() -> Self {
        Self { original: None }
    }

    fn is_stdin_tty(&self) -> bool {
        unsafe { libc::isatty(STDIN_FILENO) != 0 }
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        if stdin_is_fifo() {
            return Err(TermError::PipedStdin);
        }
        let stdin = io::stdin();
        let original = match termios::tcgetattr(&stdin) {
            Ok(attrs) => attrs,
            Err(Errno::EBADF) => return Err(TermError::ClosedStdin),
            Err(e) => return Err(e.into()),
        };
        let raw = Self::raw_attrs(&original);
        termios::tcsetattr(&stdin, SetArg::TCSADRAIN, &raw)?;
        if self.original.is_none() {
            self.original = Some(original);
        }
        debug!(target: "xtermkit", "raw mode enabled");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        if let Some(original) = &self.original {
            let stdin = io::stdin();
            termios::tcsetattr(&stdin, SetArg::TCSADRAIN, original)?;
            debug!(target: "xtermkit", "raw mode disabled");
        }
        Ok(())
    }

    fn flush_input(&mut self) -> Result<()> {
        let stdin = io::stdin();
        if let Err(e) = termios::tcflush(&stdin, FlushArg::TCIFLUSH) {
            warn!(target: "xtermkit", "cannot flush stdin: {e}");
        }
        Ok(())
    }

    fn wait_burst(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<u8>>> {
        let timeout = match timeout {
            Some(d) => PollTimeout::from(u16::try_from(d.as_millis()).unwrap_or(u16::MAX)),
            None => PollTimeout::NONE,
        };
        if poll_stdin(timeout)? == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; 1024];
        let n = read_stdin(&mut buf)?;
        if n == 0 {
            return Err(TermError::ClosedStdin);
        }
        buf.truncate(n);
        // a large paste or a flood of mouse reports may exceed one read
        while poll_stdin(PollTimeout::ZERO)? != 0 {
            let mut more = [0u8; 1024];
            let n = read_stdin(&mut more)?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&more[..n]);
        }
        Ok(Some(buf))
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let mut out = io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    fn read_chars(&mut self, prompt: &str, max_chars: usize) -> Result<String> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut direct = original.clone();
        direct.local_flags &= !LocalFlags::ICANON;
        direct.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        direct.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&stdin, SetArg::TCSADRAIN, &direct)?;

        let mut out = io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;

        let mut bytes = Vec::new();
        let answer = loop {
            let mut byte = [0u8; 1];
            match io::stdin().lock().read(&mut byte) {
                Ok(0) => break String::from_utf8_lossy(&bytes).into_owned(),
                Ok(_) => bytes.push(byte[0]),
                Err(e) => {
                    let _ = termios::tcsetattr(&stdin, SetArg::TCSADRAIN, &original);
                    return Err(e.into());
                }
            }
            let decoded = String::from_utf8_lossy(&bytes);
            if decoded.chars().count() >= max_chars {
                break decoded.into_owned();
            }
        };
        out.write_all(b"\n")?;
        out.flush()?;
        termios::tcsetattr(&stdin, SetArg::TCSADRAIN, &original)?;
        sane();
        Ok(match answer.as_str() {
            "" | "\r" | "\n" | "\r\n" => String::new(),
            _ => answer,
        })
    }
}
