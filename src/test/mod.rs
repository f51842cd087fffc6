//! End-to-end scenarios run against the scripted terminal.
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use assert_matches::assert_matches;

use crate::app::Screen;
use crate::error::TermError;
use crate::finder::FuzzyFinder;
use crate::keys::Key;
use crate::menu::{Menu, MenuEntry, MenuLevel, Orientation};
use crate::recorder::Recorder;

/// The recorder registry is process-wide, so tests that put a recorder
/// into raw mode must not overlap.
pub(crate) fn serial() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clonable capture buffer usable as a [`Screen`] sink.
#[derive(Clone, Default)]
pub(crate) struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl SharedSink {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn captured_screen(cols: usize, rows: usize) -> (Rc<RefCell<Screen>>, SharedSink) {
    let sink = SharedSink::default();
    let screen = Rc::new(RefCell::new(Screen::with_sink(
        Box::new(sink.clone()),
        cols,
        rows,
    )));
    (screen, sink)
}

#[test]
fn two_level_menu_navigation() {
    let _guard = serial();
    let received = Rc::new(RefCell::new(Vec::new()));
    let fn_a_calls = Rc::new(RefCell::new(0));

    let submenu = {
        let received = Rc::clone(&received);
        MenuLevel::new(
            [("X", MenuEntry::Value(1)), ("Y", MenuEntry::Value(2))],
            Orientation::Vertical,
        )
        .with_selector(move |value: &i32| {
            received.borrow_mut().push(*value);
            Ok(())
        })
    };
    let root = {
        let fn_a_calls = Rc::clone(&fn_a_calls);
        MenuLevel::new(
            [
                (
                    "A",
                    MenuEntry::action(move || {
                        *fn_a_calls.borrow_mut() += 1;
                        Ok(())
                    }),
                ),
                ("B", MenuEntry::submenu(submenu)),
            ],
            Orientation::Horizontal,
        )
    };

    let (screen, _sink) = captured_screen(80, 24);
    let mut menu = Menu::with_screen(root, screen);
    {
        let term = menu.recorder_mut().term_mut();
        term.feed_str("\x1b[C"); // right: point at B
        term.feed_str("\r"); // enter: push the submenu
        term.feed_str("\x1b[B"); // down: point at Y
        term.feed_str("\r"); // enter: receive(2)
        term.feed_str("\x1b"); // esc: pop back to the root
        term.feed_str("\r"); // enter: run A's action
        term.feed_key(Key::CtrlX); // leave
    }
    menu.run().unwrap();

    assert_eq!(vec![2], *received.borrow());
    assert_eq!(1, *fn_a_calls.borrow());
    assert_eq!(1, menu.state().borrow().depth());
}

#[test]
fn switching_hooks_diverts_navigation() {
    let _guard = serial();
    let observed = Rc::new(RefCell::new(Vec::new()));
    let submenu = MenuLevel::new([("X", MenuEntry::Value(1))], Orientation::Vertical)
        .with_selector(|_| Ok(()));
    let root = MenuLevel::new(
        [("open", MenuEntry::submenu(submenu))],
        Orientation::Horizontal,
    );
    let (screen, _sink) = captured_screen(80, 24);
    let mut menu = Menu::with_screen(root, screen);
    {
        let observed = Rc::clone(&observed);
        menu.recorder_mut().hook(move |burst: &str| {
            observed.borrow_mut().push(burst.to_string());
            Ok(())
        });
    }
    // with the observation hook active, ENTER no longer navigates
    menu.recorder_mut().switch_hook(1);
    {
        let term = menu.recorder_mut().term_mut();
        term.feed_str("\r");
        term.feed_key(Key::CtrlX);
    }
    menu.run().unwrap();
    assert_eq!(1, menu.state().borrow().depth());
    assert_eq!(vec!["\r".to_string(), "\x18".to_string()], *observed.borrow());
}

#[test]
fn menu_esc_on_root_is_ignored() {
    let _guard = serial();
    let root = MenuLevel::new(
        [("only", MenuEntry::<u8>::action(|| Ok(())))],
        Orientation::Horizontal,
    );
    let (screen, _sink) = captured_screen(80, 24);
    let mut menu = Menu::with_screen(root, screen);
    {
        let term = menu.recorder_mut().term_mut();
        term.feed_str("\x1b");
        term.feed_key(Key::CtrlX);
    }
    menu.run().unwrap();
    assert_eq!(1, menu.state().borrow().depth());
}

#[test]
fn menu_value_without_selector_is_a_contract_violation() {
    let _guard = serial();
    let root = MenuLevel::new([("bad", MenuEntry::Value(9))], Orientation::Horizontal);
    let (screen, _sink) = captured_screen(80, 24);
    let mut menu = Menu::with_screen(root, screen);
    menu.recorder_mut().term_mut().feed_str("\r");
    assert_matches!(menu.run(), Err(TermError::MenuContract));
}

#[test]
fn second_recorder_cannot_start_while_first_is_raw() {
    let _guard = serial();
    let outcome = Rc::new(RefCell::new(None));
    let mut first = Recorder::new();
    {
        let outcome = Rc::clone(&outcome);
        let stop = first.handle();
        first.bind("go", move || {
            let mut second = Recorder::new();
            *outcome.borrow_mut() = Some(second.start(None));
            stop.end();
            Ok(())
        });
    }
    first.term_mut().feed_str("go");
    first.start(None).unwrap();

    let outcome = outcome.borrow_mut().take().unwrap();
    assert_matches!(outcome, Err(TermError::RecorderConflict));
    // the first recorder came out of the loop with its tty restored
    assert!(first.is_cooked());
    assert!(!first.term_mut().is_raw());
}

#[test]
fn finder_full_session_with_query() {
    let _guard = serial();
    let (screen, sink) = captured_screen(80, 12);
    let mut finder =
        FuzzyFinder::with_screen(["apple", "maple", "plum", "pineapple"], screen);
    {
        let term = finder.recorder_mut().term_mut();
        term.feed_str("p");
        term.feed_str("l");
        term.feed_str("\x1b[B"); // down to the second-best match
        term.feed_str("\r");
    }
    let value = finder.run().unwrap();
    // plum sorts first, apple second
    assert_eq!(Some("apple".to_string()), value);
    let contents = sink.contents();
    // matched characters are wrapped in the highlight color
    assert!(contents.contains("\x1b[1;36mp\x1b[22;39m"));
    assert!(contents.contains("\x1b[1;36ml\x1b[22;39m"));
    // the search line redraw carries the query
    assert!(contents.contains("\x1b[2K\x1b[0Gpl"));
}

#[test]
fn finder_abort_keeps_no_value() {
    let _guard = serial();
    let (screen, _sink) = captured_screen(80, 12);
    let mut finder = FuzzyFinder::with_screen(["one", "two"], screen);
    finder.recorder_mut().term_mut().feed_key(Key::CtrlC);
    assert_eq!(None, finder.run().unwrap());
}
