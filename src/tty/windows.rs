//! Windows specific definitions
//!
//! There is no termios here, so raw mode is a console-mode switch and the
//! reader polls the console event queue one record at a time. Extended keys
//! are reported as the legacy two-byte scan codes (`0xE0`/`0x00` followed by
//! the code byte) so they hit the same alias table as the msvcrt-style
//! readers this mirrors.
use std::char::decode_utf16;
use std::io::{self, Write};
use std::mem;
use std::time::Duration;

use log::debug;
use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Console::{
    GetConsoleMode, GetConsoleScreenBufferInfo, GetNumberOfConsoleInputEvents, GetStdHandle,
    ReadConsoleInputW, SetConsoleMode, CONSOLE_MODE, CONSOLE_SCREEN_BUFFER_INFO,
    ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT,
    ENABLE_VIRTUAL_TERMINAL_PROCESSING, INPUT_RECORD, KEY_EVENT, LEFT_CTRL_PRESSED,
    RIGHT_CTRL_PRESSED, STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};
use windows_sys::Win32::System::Threading::{WaitForSingleObject, INFINITE};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    VK_DELETE, VK_DOWN, VK_END, VK_F1, VK_F2, VK_F3, VK_F4, VK_HOME, VK_LEFT, VK_NEXT, VK_PRIOR,
    VK_RIGHT, VK_UP,
};

use super::Term;
use crate::error::TermError;
use crate::Result;

fn get_std_handle(fd: u32) -> Result<HANDLE> {
    let handle = unsafe { GetStdHandle(fd) };
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error().into());
    }
    if handle.is_null() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "no stdio handle available for this process",
        )
        .into());
    }
    Ok(handle)
}

fn check(rc: i32) -> Result<()> {
    if rc == 0 {
        Err(io::Error::last_os_error().into())
    } else {
        Ok(())
    }
}

/// Columns and rows of the console window, `(80, 24)` when unknown.
pub fn window_size() -> (usize, usize) {
    let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { mem::zeroed() };
    let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
    match unsafe { GetConsoleScreenBufferInfo(handle, &mut info) } {
        0 => (80, 24),
        _ => (
            info.dwSize.X as usize,
            (1 + info.srWindow.Bottom - info.srWindow.Top) as usize,
        ),
    }
}

/// There is no `stty` to shell out to on this platform.
pub fn sane() {}

/// Scan-code burst for an extended key, per the msvcrt convention.
fn scan_code(vk: u16, ctrl: bool) -> Option<&'static str> {
    Some(match vk {
        _ if vk == VK_UP => "\u{e0}H",
        _ if vk == VK_DOWN => "\u{e0}P",
        _ if vk == VK_LEFT && ctrl => "\u{e0}s",
        _ if vk == VK_LEFT => "\u{e0}K",
        _ if vk == VK_RIGHT && ctrl => "\u{e0}t",
        _ if vk == VK_RIGHT => "\u{e0}M",
        _ if vk == VK_HOME => "\u{e0}G",
        _ if vk == VK_END => "\u{e0}O",
        _ if vk == VK_PRIOR => "\u{e0}I",
        _ if vk == VK_NEXT => "\u{e0}Q",
        _ if vk == VK_DELETE && ctrl => "\u{e0}\u{93}",
        _ if vk == VK_DELETE => "\u{e0}S",
        _ if vk == VK_F1 => "\x00;",
        _ if vk == VK_F2 => "\x00<",
        _ if vk == VK_F3 => "\x00=",
        _ if vk == VK_F4 => "\x00>",
        _ => return None,
    })
}

pub struct ConsoleTerm {
    conin: HANDLE,
    original_mode: Option<CONSOLE_MODE>,
    surrogate: u16,
}

pub type Terminal = ConsoleTerm;

impl ConsoleTerm {
    /// One decoded key, or `None` when the queue held no usable event.
    fn next_event(&mut self) -> Result<Option<String>> {
        let mut rec: INPUT_RECORD = unsafe { mem::zeroed() };
        let mut count = 0;
        check(unsafe { ReadConsoleInputW(self.conin, &mut rec, 1, &mut count) })?;
        if count == 0 || rec.EventType != KEY_EVENT as u16 {
            return Ok(None);
        }
        let key_event = unsafe { rec.Event.KeyEvent };
        if key_event.bKeyDown == 0 {
            return Ok(None);
        }
        let ctrl =
            key_event.dwControlKeyState & (LEFT_CTRL_PRESSED | RIGHT_CTRL_PRESSED) != 0;
        let utf16 = unsafe { key_event.uChar.UnicodeChar };
        if utf16 == 0 {
            return Ok(scan_code(key_event.wVirtualKeyCode, ctrl).map(str::to_string));
        }
        if (0xD800..0xDC00).contains(&utf16) {
            self.surrogate = utf16;
            return Ok(None);
        }
        let units = if self.surrogate == 0 {
            vec![utf16]
        } else {
            vec![mem::take(&mut self.surrogate), utf16]
        };
        match decode_utf16(units).next() {
            Some(Ok(c)) => Ok(Some(c.to_string())),
            _ => Ok(None),
        }
    }

    fn pending_events(&self) -> u32 {
        let mut n = 0;
        if unsafe { GetNumberOfConsoleInputEvents(self.conin, &mut n) } == 0 {
            0
        } else {
            n
        }
    }
}

impl Term for ConsoleTerm {
    fn new() -> Self {
        Self {
            conin: INVALID_HANDLE_VALUE,
            original_mode: None,
            surrogate: 0,
        }
    }

    fn is_stdin_tty(&self) -> bool {
        let mut mode = 0;
        let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
        unsafe { GetConsoleMode(handle, &mut mode) != 0 }
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        self.conin = get_std_handle(STD_INPUT_HANDLE)?;
        let mut original = 0;
        if unsafe { GetConsoleMode(self.conin, &mut original) } == 0 {
            // redirected stdin has no console mode
            return Err(TermError::PipedStdin);
        }
        let raw = original & !(ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT | ENABLE_PROCESSED_INPUT);
        check(unsafe { SetConsoleMode(self.conin, raw) })?;
        if self.original_mode.is_none() {
            self.original_mode = Some(original);
        }
        // let the console interpret the escape sequences we emit
        if let Ok(conout) = get_std_handle(STD_OUTPUT_HANDLE) {
            let mut out_mode = 0;
            if unsafe { GetConsoleMode(conout, &mut out_mode) } != 0 {
                let _ = unsafe {
                    SetConsoleMode(conout, out_mode | ENABLE_VIRTUAL_TERMINAL_PROCESSING)
                };
            }
        }
        debug!(target: "xtermkit", "console raw mode enabled");
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<()> {
        if let Some(original) = self.original_mode {
            check(unsafe { SetConsoleMode(self.conin, original) })?;
        }
        Ok(())
    }

    fn flush_input(&mut self) -> Result<()> {
        while self.pending_events() > 0 {
            let _ = self.next_event()?;
        }
        Ok(())
    }

    fn wait_burst(&mut self, timeout: Option<Duration>) -> Result<Option<Vec<u8>>> {
        let millis = timeout.map_or(INFINITE, |d| u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
        match unsafe { WaitForSingleObject(self.conin, millis) } {
            WAIT_OBJECT_0 => {}
            WAIT_TIMEOUT => return Ok(None),
            _ => return Err(io::Error::last_os_error().into()),
        }
        let mut burst = String::new();
        loop {
            if let Some(key) = self.next_event()? {
                burst.push_str(&key);
            }
            if self.pending_events() == 0 {
                break;
            }
        }
        Ok(Some(burst.into_bytes()))
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
        self.conin = get_std_handle(STD_INPUT_HANDLE)?;
        let mut out = io::stdout();
        out.write_all(prompt.as_bytes())?;
        out.flush()?;
        let mut answer = String::new();
        while answer.chars().count() < max_chars {
            match unsafe { WaitForSingleObject(self.conin, INFINITE) } {
                WAIT_OBJECT_0 => {}
                _ => return Err(io::Error::last_os_error().into()),
            }
            if let Some(key) = self.next_event()? {
                if key == "\x03" {
                    out.write_all(b"^C")?;
                    out.flush()?;
                    return Err(TermError::Interrupted);
                }
                out.write_all(key.as_bytes())?;
                out.flush()?;
                answer.push_str(&key);
            }
        }
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(match answer.as_str() {
            "" | "\r" | "\n" | "\r\n" => String::new(),
            _ => answer,
        })
    }
}
