//! Application scope: XTerm mode switching and the guarded output sink
//!
//! An [`XtermApp`] owns a declarative [`XtermConfig`], a [`Recorder`] and a
//! [`Screen`]. Entering the scope writes the baseline reset followed by the
//! configured DEC private-mode enables; leaving it writes the baseline reset
//! plus the inverse of every non-idempotent toggle, then falls back to
//! `stty sane`. The screen's `write`/`flush` silently do nothing outside
//! the scope, so rendering code never has to care whether the terminal is
//! set up — that guard is the only place silent failure is acceptable.
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use bitflags::bitflags;
use log::debug;

use crate::error::TermError;
use crate::recorder::Recorder;
use crate::tty;
use crate::Result;

/// Written unconditionally at open and close: autowrap on, cursor visible,
/// every mouse protocol and motion reporting off, DECCKM off.
const BASELINE_RESET: &str = "\x1b[?7h\x1b[?25h\x1b[?1005l\x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1l";

/// Which DEC private modes an application enables on open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XtermConfig {
    pub(crate) alternate_buffer: bool,
    pub(crate) alternate_scroll: bool,
    pub(crate) hide_cursor: bool,
    pub(crate) scrolling_region: Option<(u16, u16)>,
    pub(crate) meta_key: bool,
    pub(crate) alt_numlock: bool,
    pub(crate) smooth_scroll: bool,
    pub(crate) fast_scroll: bool,
    pub(crate) auto_wrap: bool,
    pub(crate) sgr_mouse: bool,
    pub(crate) utf8_mouse: bool,
    pub(crate) urxvt_mouse: bool,
    pub(crate) mouse_events: bool,
}

impl Default for XtermConfig {
    fn default() -> Self {
        Self {
            alternate_buffer: false,
            alternate_scroll: false,
            hide_cursor: false,
            scrolling_region: None,
            meta_key: false,
            alt_numlock: false,
            smooth_scroll: true,
            fast_scroll: false,
            auto_wrap: true,
            sgr_mouse: false,
            utf8_mouse: false,
            urxvt_mouse: false,
            mouse_events: false,
        }
    }
}

impl XtermConfig {
    /// Returns an `XtermConfig` builder.
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }
}

/// Builder for [`XtermConfig`].
#[derive(Debug, Default)]
pub struct Builder {
    config: XtermConfig,
}

impl Builder {
    /// Switch to the alternate screen buffer while the app runs.
    #[must_use]
    pub fn alternate_buffer(mut self, yes: bool) -> Self {
        self.config.alternate_buffer = yes;
        self
    }

    /// Send cursor keys for the mouse wheel in the alternate buffer.
    #[must_use]
    pub fn alternate_scroll(mut self, yes: bool) -> Self {
        self.config.alternate_scroll = yes;
        self
    }

    #[must_use]
    pub fn hide_cursor(mut self, yes: bool) -> Self {
        self.config.hide_cursor = yes;
        self
    }

    /// Restrict scrolling to rows `top..=bottom`.
    #[must_use]
    pub fn scrolling_region(mut self, top: u16, bottom: u16) -> Self {
        self.config.scrolling_region = Some((top, bottom));
        self
    }

    /// Make the Meta key set the eighth bit.
    #[must_use]
    pub fn meta_key(mut self, yes: bool) -> Self {
        self.config.meta_key = yes;
        self
    }

    /// Treat Alt and NumLock specially, as in older xterms.
    #[must_use]
    pub fn alt_numlock(mut self, yes: bool) -> Self {
        self.config.alt_numlock = yes;
        self
    }

    /// Jump scroll instead of smooth scroll when disabled.
    #[must_use]
    pub fn smooth_scroll(mut self, yes: bool) -> Self {
        self.config.smooth_scroll = yes;
        self
    }

    #[must_use]
    pub fn fast_scroll(mut self, yes: bool) -> Self {
        self.config.fast_scroll = yes;
        self
    }

    /// Wrap at the right margin; disabling writes `ESC[?7l` on open.
    #[must_use]
    pub fn auto_wrap(mut self, yes: bool) -> Self {
        self.config.auto_wrap = yes;
        self
    }

    #[must_use]
    pub fn sgr_mouse(mut self, yes: bool) -> Self {
        self.config.sgr_mouse = yes;
        self
    }

    #[must_use]
    pub fn utf8_mouse(mut self, yes: bool) -> Self {
        self.config.utf8_mouse = yes;
        self
    }

    #[must_use]
    pub fn urxvt_mouse(mut self, yes: bool) -> Self {
        self.config.urxvt_mouse = yes;
        self
    }

    /// Report all mouse motion and button events.
    #[must_use]
    pub fn mouse_events(mut self, yes: bool) -> Self {
        self.config.mouse_events = yes;
        self
    }

    #[must_use]
    pub fn build(self) -> XtermConfig {
        self.config
    }
}

bitflags! {
    /// Error kinds an application scope swallows on the way out.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SafeExits: u8 {
        /// [`TermError::Interrupted`]
        const INTERRUPT = 1 << 0;
        /// [`TermError::Exit`]
        const EXIT = 1 << 1;
    }
}

impl Default for SafeExits {
    fn default() -> Self {
        SafeExits::INTERRUPT | SafeExits::EXIT
    }
}

/// The guarded output sink shared by an application and its render code.
///
/// `write` and `flush` forward to the sink only between `open` and `close`;
/// anywhere else they are deliberate no-ops.
pub struct Screen {
    out: Box<dyn Write>,
    in_context: bool,
    cols: usize,
    rows: usize,
}

impl Screen {
    /// A screen on stdout, sized from the controlling terminal.
    pub fn stdout() -> Self {
        let (cols, rows) = tty::window_size();
        Self::with_sink(Box::new(io::stdout()), cols, rows)
    }

    /// A screen writing somewhere else, with an explicit size.
    pub fn with_sink(out: Box<dyn Write>, cols: usize, rows: usize) -> Self {
        Self {
            out,
            in_context: false,
            cols,
            rows,
        }
    }

    /// `(columns, rows)`, captured when the screen was created.
    pub fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    pub fn in_context(&self) -> bool {
        self.in_context
    }

    /// Context-guarded write.
    pub fn write(&mut self, s: &str) -> Result<()> {
        if self.in_context {
            self.out.write_all(s.as_bytes())?;
        }
        Ok(())
    }

    /// Context-guarded flush.
    pub fn flush(&mut self) -> Result<()> {
        if self.in_context {
            self.out.flush()?;
        }
        Ok(())
    }

    fn write_raw(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Write the baseline reset and the configured mode enables, then mark
    /// the scope active.
    pub(crate) fn open(&mut self, config: &XtermConfig) -> Result<()> {
        self.write_raw(BASELINE_RESET)?;
        self.write_raw("\x1b[?1h")?;
        if config.alternate_buffer {
            self.write_raw("\x1b[?1049h")?;
        }
        if config.utf8_mouse {
            self.write_raw("\x1b[?1005h")?;
        }
        if config.sgr_mouse {
            self.write_raw("\x1b[?1006h")?;
        }
        if config.alternate_scroll {
            self.write_raw("\x1b[?1007h")?;
        }
        if config.urxvt_mouse {
            self.write_raw("\x1b[?1015h")?;
        }
        if !config.auto_wrap {
            self.write_raw("\x1b[?7l")?;
        }
        if config.hide_cursor {
            self.write_raw("\x1b[?25l")?;
        }
        if let Some((top, bottom)) = config.scrolling_region {
            self.write_raw(&format!("\x1b[{top};{bottom}r"))?;
        }
        if !config.smooth_scroll {
            self.write_raw("\x1b[?4l")?;
        }
        if config.fast_scroll {
            self.write_raw("\x1b[?1014h")?;
        }
        if config.meta_key {
            self.write_raw("\x1b[?1034h")?;
        }
        if config.alt_numlock {
            self.write_raw("\x1b[?1035h")?;
        }
        if config.mouse_events {
            self.write_raw("\x1b[?1003h")?;
        }
        self.in_context = true;
        self.out.flush()?;
        debug!(target: "xtermkit", "application scope opened");
        Ok(())
    }

    /// Leave the scope: baseline reset, inverse of the non-idempotent
    /// toggles, then `stty sane` regardless of what preceded.
    pub(crate) fn close(&mut self, config: &XtermConfig) -> Result<()> {
        self.in_context = false;
        self.write_raw(BASELINE_RESET)?;
        if config.alternate_scroll {
            self.write_raw("\x1b[?1007l")?;
        }
        if config.scrolling_region.is_some() {
            self.write_raw("\x1b[;r")?;
        }
        if !config.smooth_scroll {
            self.write_raw("\x1b[?4h")?;
        }
        if config.fast_scroll {
            self.write_raw("\x1b[?1014l")?;
        }
        if config.meta_key {
            self.write_raw("\x1b[?1034l")?;
        }
        if config.alt_numlock {
            self.write_raw("\x1b[?1035l")?;
        }
        if config.alternate_buffer {
            self.write_raw("\x1b[?1049l")?;
        }
        self.out.flush()?;
        tty::sane();
        debug!(target: "xtermkit", "application scope closed");
        Ok(())
    }
}

/// Scope manager tying a config, a recorder and a screen together.
pub struct XtermApp {
    config: XtermConfig,
    screen: Rc<RefCell<Screen>>,
    recorder: Recorder,
    safe_exits: SafeExits,
}

impl XtermApp {
    pub fn new(config: XtermConfig, screen: Rc<RefCell<Screen>>) -> Self {
        Self {
            config,
            screen,
            recorder: Recorder::new(),
            safe_exits: SafeExits::default(),
        }
    }

    /// Replace the set of swallowed error kinds.
    #[must_use]
    pub fn with_safe_exits(mut self, safe_exits: SafeExits) -> Self {
        self.safe_exits = safe_exits;
        self
    }

    pub fn screen(&self) -> Rc<RefCell<Screen>> {
        Rc::clone(&self.screen)
    }

    pub fn config(&self) -> &XtermConfig {
        &self.config
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    /// Swap in another recorder. The current one must have ended.
    pub fn set_recorder(&mut self, recorder: Recorder) -> Result<()> {
        if !self.recorder.is_cooked() {
            return Err(TermError::UnterminatedRecorder);
        }
        self.recorder = recorder;
        Ok(())
    }

    /// Enter the scope: write the mode-setting sequences and arm the
    /// guarded sink.
    pub fn open(&mut self) -> Result<()> {
        self.screen.borrow_mut().open(&self.config)
    }

    /// Run the recorder's read loop.
    pub fn start(&mut self, timeout: Option<std::time::Duration>) -> Result<()> {
        self.recorder.start(timeout)
    }

    /// Leave the scope: end the recorder, restore the terminal modes.
    pub fn close(&mut self) -> Result<()> {
        self.recorder.end();
        self.screen.borrow_mut().close(&self.config)
    }

    /// Apply the safe-exit filter to a scope result.
    pub fn guard(&self, res: Result<()>) -> Result<()> {
        match res {
            Err(e) if self.absorbs(&e) => Ok(()),
            other => other,
        }
    }

    fn absorbs(&self, err: &TermError) -> bool {
        match err {
            TermError::Interrupted => self.safe_exits.contains(SafeExits::INTERRUPT),
            TermError::Exit => self.safe_exits.contains(SafeExits::EXIT),
            _ => false,
        }
    }
}

impl Drop for XtermApp {
    fn drop(&mut self) {
        // guaranteed release: restore the terminal even on panic paths
        let open = self.screen.borrow().in_context();
        if open {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SafeExits, Screen, XtermApp, XtermConfig};
    use crate::error::TermError;
    use crate::test::SharedSink;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn captured_app(config: XtermConfig) -> (XtermApp, SharedSink) {
        let sink = SharedSink::default();
        let screen = Rc::new(RefCell::new(Screen::with_sink(
            Box::new(sink.clone()),
            80,
            24,
        )));
        (XtermApp::new(config, screen), sink)
    }

    #[test]
    fn baseline_reset_brackets_the_scope() {
        let (mut app, sink) = captured_app(XtermConfig::default());
        app.open().unwrap();
        app.close().unwrap();
        let bytes = sink.contents();
        assert!(bytes.starts_with("\x1b[?7h\x1b[?25h\x1b[?1005l\x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1l\x1b[?1h"));
        assert!(bytes.ends_with("\x1b[?7h\x1b[?25h\x1b[?1005l\x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1l"));
    }

    #[test]
    fn every_config_bit_is_reverted() {
        let config = XtermConfig::builder()
            .alternate_buffer(true)
            .alternate_scroll(true)
            .hide_cursor(true)
            .scrolling_region(2, 22)
            .meta_key(true)
            .alt_numlock(true)
            .smooth_scroll(false)
            .fast_scroll(true)
            .auto_wrap(false)
            .sgr_mouse(true)
            .utf8_mouse(true)
            .urxvt_mouse(true)
            .mouse_events(true)
            .build();
        let (mut app, sink) = captured_app(config);
        app.open().unwrap();
        sink.clear();
        app.close().unwrap();
        let close_bytes = sink.contents();
        // autowrap, cursor and mouse modes come back through the baseline
        assert!(close_bytes.contains("\x1b[?7h"));
        assert!(close_bytes.contains("\x1b[?25h"));
        assert!(close_bytes.contains("\x1b[?1003l"));
        // the non-idempotent toggles are reverted explicitly
        for seq in [
            "\x1b[?1007l", "\x1b[;r", "\x1b[?4h", "\x1b[?1014l", "\x1b[?1034l", "\x1b[?1035l",
            "\x1b[?1049l",
        ] {
            assert!(close_bytes.contains(seq), "missing {seq:?}");
        }
    }

    #[test]
    fn open_writes_requested_modes_in_order() {
        let config = XtermConfig::builder()
            .alternate_buffer(true)
            .hide_cursor(true)
            .scrolling_region(1, 23)
            .build();
        let (mut app, sink) = captured_app(config);
        app.open().unwrap();
        let bytes = sink.contents();
        let buffer_at = bytes.find("\x1b[?1049h").unwrap();
        let cursor_at = bytes.find("\x1b[?25l").unwrap();
        let region_at = bytes.find("\x1b[1;23r").unwrap();
        assert!(buffer_at < cursor_at && cursor_at < region_at);
        app.close().unwrap();
    }

    #[test]
    fn writes_are_noops_outside_the_scope() {
        let (mut app, sink) = captured_app(XtermConfig::default());
        app.screen().borrow_mut().write("before").unwrap();
        assert_eq!("", sink.contents());
        app.open().unwrap();
        app.screen().borrow_mut().write("inside").unwrap();
        app.close().unwrap();
        app.screen().borrow_mut().write("after").unwrap();
        assert!(sink.contents().contains("inside"));
        assert!(!sink.contents().contains("before"));
        assert!(!sink.contents().contains("after"));
    }

    #[test]
    fn guard_filters_safe_exits() {
        let (app, _sink) = captured_app(XtermConfig::default());
        assert_matches!(app.guard(Err(TermError::Interrupted)), Ok(()));
        assert_matches!(app.guard(Err(TermError::Exit)), Ok(()));
        assert_matches!(
            app.guard(Err(TermError::RecorderConflict)),
            Err(TermError::RecorderConflict)
        );

        let (app, _sink) = captured_app(XtermConfig::default());
        let app = app.with_safe_exits(SafeExits::INTERRUPT);
        assert_matches!(app.guard(Err(TermError::Exit)), Err(TermError::Exit));
    }

    #[test]
    fn drop_closes_an_open_scope() {
        let sink = SharedSink::default();
        {
            let screen = Rc::new(RefCell::new(Screen::with_sink(
                Box::new(sink.clone()),
                80,
                24,
            )));
            let mut app = XtermApp::new(XtermConfig::default(), screen);
            app.open().unwrap();
            sink.clear();
        }
        assert!(sink.contents().contains("\x1b[?1l"));
    }

    #[test]
    fn replacing_a_live_recorder_is_refused() {
        let _guard = crate::test::serial();
        use crate::recorder::Recorder;
        let (mut app, _sink) = captured_app(XtermConfig::default());
        app.recorder_mut().force_raw();
        assert_matches!(
            app.set_recorder(Recorder::new()),
            Err(TermError::UnterminatedRecorder)
        );
        app.recorder_mut().end();
        assert_matches!(app.set_recorder(Recorder::new()), Ok(()));
    }
}
