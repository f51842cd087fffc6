//! Keyboard recorder: owns the line discipline and the read loop
//!
//! A [`Recorder`] puts stdin into raw mode, blocks for input, decodes each
//! drained read into one burst string, and routes it through the bindings
//! registered for that exact string, then through the active hook. The tty
//! is a process-wide singleton, so a registry of live recorders refuses a
//! second raw-mode owner.
use std::cell::RefCell;
use std::collections::HashMap;
use std::process;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use log::{debug, warn};

use crate::error::TermError;
use crate::keys::Key;
use crate::tty::{self, Term};
use crate::Result;

/// A parameter-less callback fired when its bound burst arrives.
///
/// Returning [`TermError::Interrupted`] or [`TermError::Exit`] stops the
/// read loop cleanly; any other error stops it and propagates.
pub trait Action {
    fn invoke(&mut self) -> Result<()>;
}

impl<F: FnMut() -> Result<()>> Action for F {
    fn invoke(&mut self) -> Result<()> {
        self()
    }
}

/// A callback receiving every burst after the bindings have run.
pub trait Hook {
    fn handle(&mut self, burst: &str) -> Result<()>;
}

impl<F: FnMut(&str) -> Result<()>> Hook for F {
    fn handle(&mut self, burst: &str) -> Result<()> {
        self(burst)
    }
}

/// Anything that names a set of input aliases: a [`Key`], a key group, or a
/// raw burst string.
pub trait Bindable {
    fn aliases(&self) -> Vec<String>;
}

impl Bindable for Key {
    fn aliases(&self) -> Vec<String> {
        Key::aliases(*self).iter().map(|s| (*s).to_string()).collect()
    }
}

impl Bindable for &str {
    fn aliases(&self) -> Vec<String> {
        vec![(*self).to_string()]
    }
}

impl Bindable for &[Key] {
    fn aliases(&self) -> Vec<String> {
        self.iter().flat_map(Bindable::aliases).collect()
    }
}

impl<const N: usize> Bindable for [Key; N] {
    fn aliases(&self) -> Vec<String> {
        self.as_slice().aliases()
    }
}

#[derive(Debug)]
struct RecorderShared {
    raw: AtomicBool,
}

static RECORDERS: Mutex<Vec<Weak<RecorderShared>>> = Mutex::new(Vec::new());

fn registry() -> std::sync::MutexGuard<'static, Vec<Weak<RecorderShared>>> {
    RECORDERS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap handle onto a recorder's stop flag.
///
/// Bindings and hooks run while the recorder is mutably borrowed by its own
/// loop, so they stop it through this handle instead: the loop ends after
/// the burst being dispatched, then restores the tty.
#[derive(Debug, Clone)]
pub struct RecorderHandle(Arc<RecorderShared>);

impl RecorderHandle {
    /// Request termination of the read loop.
    pub fn end(&self) {
        self.0.raw.store(false, Ordering::SeqCst);
    }

    pub fn is_cooked(&self) -> bool {
        !self.0.raw.load(Ordering::SeqCst)
    }
}

type Actions = Vec<Rc<RefCell<dyn Action>>>;

pub struct Recorder {
    term: tty::Terminal,
    bindings: HashMap<String, Actions>,
    hooks: Vec<Box<dyn Hook>>,
    which: usize,
    shared: Arc<RecorderShared>,
    raw_active: bool,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        let shared = Arc::new(RecorderShared {
            raw: AtomicBool::new(false),
        });
        registry().push(Arc::downgrade(&shared));
        Self {
            term: tty::Terminal::new(),
            bindings: HashMap::new(),
            hooks: Vec::new(),
            which: 0,
            shared,
            raw_active: false,
        }
    }

    /// Associate `action` with every alias of `pattern`. Actions bound to
    /// the same alias fire in insertion order.
    pub fn bind(&mut self, pattern: impl Bindable, action: impl Action + 'static) {
        let action: Rc<RefCell<dyn Action>> = Rc::new(RefCell::new(action));
        for alias in pattern.aliases() {
            self.bindings
                .entry(alias)
                .or_default()
                .push(Rc::clone(&action));
        }
    }

    /// Append a hook. The first hook added is the active one.
    pub fn hook(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Move the active hook by `delta`, wrapping around the hook list.
    pub fn switch_hook(&mut self, delta: isize) {
        if !self.hooks.is_empty() {
            let len = self.hooks.len() as isize;
            self.which = (self.which as isize + delta).rem_euclid(len) as usize;
        }
    }

    /// Stop handle usable from inside bindings and hooks.
    pub fn handle(&self) -> RecorderHandle {
        RecorderHandle(Arc::clone(&self.shared))
    }

    /// Whether the tty is in its original line discipline.
    pub fn is_cooked(&self) -> bool {
        !self.raw_active && !self.shared.raw.load(Ordering::SeqCst)
    }

    pub(crate) fn term_mut(&mut self) -> &mut tty::Terminal {
        &mut self.term
    }

    #[cfg(test)]
    pub(crate) fn force_raw(&mut self) {
        self.term.enable_raw_mode().expect("test terminal");
        self.raw_active = true;
        self.shared.raw.store(true, Ordering::SeqCst);
    }

    /// Enter raw mode and run the read loop until a handler requests the
    /// end, the optional `timeout` expires, or a handler fails. The line
    /// discipline is restored on every path out; clean-stop errors
    /// ([`TermError::Interrupted`], [`TermError::Exit`]) are swallowed.
    pub fn start(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.conflicts() {
            return Err(TermError::RecorderConflict);
        }
        self.enter_raw()?;
        let res = self.record(timeout);
        self.end();
        match res {
            Err(TermError::Interrupted) | Err(TermError::Exit) => Ok(()),
            other => other,
        }
    }

    /// Restore the saved line discipline and discard pending input.
    pub fn end(&mut self) {
        self.shared.raw.store(false, Ordering::SeqCst);
        if self.raw_active {
            self.raw_active = false;
            if let Err(e) = self.term.disable_raw_mode() {
                warn!(target: "xtermkit", "cannot restore line discipline: {e}");
            }
            let _ = self.term.flush_input();
        }
    }

    /// Read a line of user input. With `max_chars` set while raw, the
    /// recorder ends itself and reads exactly that many characters;
    /// otherwise the read is delegated to the cooked line reader.
    pub fn input(&mut self, prompt: &str, max_chars: Option<usize>) -> Result<String> {
        match max_chars {
            Some(n) if !self.is_cooked() => {
                self.end();
                self.term.read_chars(prompt, n)
            }
            _ => {
                tty::sane();
                self.term.read_line(prompt)
            }
        }
    }

    fn conflicts(&self) -> bool {
        registry().iter().any(|weak| {
            weak.upgrade().is_some_and(|other| {
                !Arc::ptr_eq(&other, &self.shared) && other.raw.load(Ordering::SeqCst)
            })
        })
    }

    fn enter_raw(&mut self) -> Result<()> {
        self.term.enable_raw_mode()?;
        self.raw_active = true;
        self.shared.raw.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn record(&mut self, timeout: Option<Duration>) -> Result<()> {
        while self.shared.raw.load(Ordering::SeqCst) {
            let bytes = match self.term.wait_burst(timeout)? {
                Some(bytes) => bytes,
                None => return Ok(()),
            };
            if bytes.is_empty() {
                continue;
            }
            let burst = decode_burst(bytes);
            debug!(target: "xtermkit", "burst: {burst:?}");
            self.dispatch(&burst)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, burst: &str) -> Result<()> {
        let actions = self.bindings.get(burst).cloned();
        let bound = actions.is_some();
        if let Some(actions) = actions {
            for action in actions {
                action.borrow_mut().invoke()?;
            }
        }
        if !bound && Key::CtrlD.matches(burst) {
            // rescue key: nothing claimed Ctrl-D, bail out of the process
            self.end();
            process::exit(1);
        }
        if let Some(hook) = self.hooks.get_mut(self.which) {
            hook.handle(burst)?;
        }
        Ok(())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.end();
        registry().retain(|weak| {
            weak.upgrade()
                .map_or(false, |other| !Arc::ptr_eq(&other, &self.shared))
        });
    }
}

/// Decode one burst: UTF-8 when valid, ISO-8859-1 otherwise.
fn decode_burst(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!(target: "xtermkit", "invalid utf-8 burst, decoding as iso-8859-1");
            e.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}
