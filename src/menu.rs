//! Nested navigation menu
//!
//! A stack of selectable levels, each rendered horizontally (equal cells
//! across the terminal width) or vertically (one item per line). Arrows
//! move the wrap-around cursor, ENTER resolves the pointed entry, ESC pops
//! back one level, Ctrl-X / Ctrl-C leave the application.
use std::cell::RefCell;
use std::rc::Rc;

use crate::app::{Screen, XtermApp, XtermConfig};
use crate::cursor_list::CursorList;
use crate::error::TermError;
use crate::keys::Key;
use crate::recorder::RecorderHandle;
use crate::text::trim;
use crate::Result;

type InvokeFn<T> = Rc<RefCell<dyn FnMut(&mut MenuState<T>) -> Result<()>>>;
type SelectorFn<T> = Rc<RefCell<dyn FnMut(&T) -> Result<()>>>;

/// What an item resolves to on ENTER.
pub enum MenuEntry<T> {
    /// A payload handed to the level's selector.
    Value(T),
    /// An action run directly, with access to the menu state.
    Invoke(InvokeFn<T>),
}

impl<T> Clone for MenuEntry<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            MenuEntry::Value(v) => MenuEntry::Value(v.clone()),
            MenuEntry::Invoke(f) => MenuEntry::Invoke(Rc::clone(f)),
        }
    }
}

impl<T: Clone + 'static> MenuEntry<T> {
    /// An entry that runs a plain callable.
    pub fn action(f: impl FnMut() -> Result<()> + 'static) -> Self {
        let f = Rc::new(RefCell::new(f));
        MenuEntry::Invoke(Rc::new(RefCell::new(move |_: &mut MenuState<T>| {
            (*f.borrow_mut())()
        })))
    }

    /// An entry that pushes `level` onto the stack.
    pub fn submenu(level: MenuLevel<T>) -> Self {
        MenuEntry::Invoke(Rc::new(RefCell::new(move |state: &mut MenuState<T>| {
            state.add_menu(level.clone(), 0)
        })))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One level of the stack: labelled entries, an optional selector and a
/// rendering orientation.
pub struct MenuLevel<T> {
    items: CursorList<(String, MenuEntry<T>)>,
    selector: Option<SelectorFn<T>>,
    mode: Orientation,
}

impl<T> Clone for MenuLevel<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            selector: self.selector.clone(),
            mode: self.mode,
        }
    }
}

impl<T> MenuLevel<T> {
    pub fn new(
        items: impl IntoIterator<Item = (impl Into<String>, MenuEntry<T>)>,
        mode: Orientation,
    ) -> Self {
        Self {
            items: CursorList::new(
                items.into_iter().map(|(label, entry)| (label.into(), entry)),
                true,
            ),
            selector: None,
            mode,
        }
    }

    /// Resolve `Value` entries through `selector` on ENTER.
    #[must_use]
    pub fn with_selector(mut self, selector: impl FnMut(&T) -> Result<()> + 'static) -> Self {
        self.selector = Some(Rc::new(RefCell::new(selector)));
        self
    }

    pub fn pointer(&self) -> usize {
        self.items.pointer()
    }
}

/// Mutable menu state driven by the recorder hook.
pub struct MenuState<T> {
    screen: Rc<RefCell<Screen>>,
    config: XtermConfig,
    stop: Option<RecorderHandle>,
    menus: Vec<MenuLevel<T>>,
}

enum Resolved<T> {
    Select(SelectorFn<T>),
    Invoke(InvokeFn<T>),
}

impl<T: Clone + 'static> MenuState<T> {
    /// Route one burst: ESC pops (below the root), ENTER resolves, arrows
    /// matching the orientation move the cursor; anything else just
    /// redraws.
    pub fn simple_nav(&mut self, burst: &str) -> Result<()> {
        if Key::Esc.matches(burst) && self.menus.len() > 1 {
            self.display(true, true)
        } else if Key::Enter.matches(burst) {
            self.choose()
        } else {
            if let Some(level) = self.menus.last_mut() {
                let vertical = level.mode == Orientation::Vertical;
                if vertical && Key::Down.matches(burst)
                    || !vertical && Key::Right.matches(burst)
                {
                    level.items.advance(1);
                } else if vertical && Key::Up.matches(burst)
                    || !vertical && Key::Left.matches(burst)
                {
                    level.items.retreat(1);
                }
            }
            self.display(false, true)
        }
    }

    /// Resolve the pointed entry: selector for a payload, direct call for
    /// an action. A payload in a level without a selector is a contract
    /// violation.
    fn choose(&mut self) -> Result<()> {
        let resolved = {
            let level = match self.menus.last() {
                Some(level) => level,
                None => return Err(TermError::MenuContract),
            };
            match level.items.current() {
                Some((_, MenuEntry::Invoke(f))) => Resolved::Invoke(Rc::clone(f)),
                Some((_, MenuEntry::Value(_))) => match &level.selector {
                    Some(selector) => Resolved::Select(Rc::clone(selector)),
                    None => return Err(TermError::MenuContract),
                },
                None => return Err(TermError::MenuContract),
            }
        };
        match resolved {
            Resolved::Select(selector) => {
                if let Some(level) = self.menus.last() {
                    if let Some((_, MenuEntry::Value(value))) = level.items.current() {
                        let mut selector = selector.borrow_mut();
                        (&mut *selector)(value)?;
                    }
                }
                Ok(())
            }
            Resolved::Invoke(f) => {
                let mut f = f.borrow_mut();
                (&mut *f)(self)
            }
        }
    }

    /// Render the active level. `use_previous` pops the stack first (the
    /// revealed level starts back at its first item).
    pub fn display(&mut self, use_previous: bool, cleanup: bool) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        if cleanup {
            self.cleanup()?;
        }
        if use_previous {
            self.menus.pop();
            if let Some(level) = self.menus.last_mut() {
                level.items.set_pointer(0);
            }
        }
        let (cols, _) = self.screen.borrow().size();
        let level = match self.menus.last() {
            Some(level) => level,
            None => return Ok(()),
        };
        let mut out = String::new();
        match level.mode {
            Orientation::Horizontal => {
                let cell = cols / level.items.len().max(1);
                for (i, (label, _)) in level.items.iter().enumerate() {
                    let text = format!("{:<cell$}", trim(label, cell));
                    if i == level.items.pointer() {
                        out.push_str("\x1b[7m");
                        out.push_str(&text);
                        out.push_str("\x1b[0m");
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Orientation::Vertical => {
                let width = level
                    .items
                    .iter()
                    .map(|(label, _)| label.chars().count())
                    .max()
                    .unwrap_or(0)
                    .min(cols);
                let lines: Vec<String> = level
                    .items
                    .iter()
                    .enumerate()
                    .map(|(i, (label, _))| {
                        let text = format!("{:<width$}", trim(label, width));
                        if i == level.items.pointer() {
                            format!("\x1b[7m{text}\x1b[0m")
                        } else {
                            text
                        }
                    })
                    .collect();
                out = lines.join("\x1b[E");
            }
        }
        out.push_str("\r\n");
        let mut screen = self.screen.borrow_mut();
        screen.write(&out)?;
        screen.flush()
    }

    /// Erase whatever the previous render put on screen.
    pub fn cleanup(&mut self) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        let rows = match self.menus.last() {
            Some(level) if level.mode == Orientation::Vertical => level.items.len(),
            Some(_) => 1,
            None => 0,
        };
        let mut out = String::from("\x1b[0J");
        for _ in 0..rows {
            out.push_str("\x1b[F\x1b[2K");
        }
        self.screen.borrow_mut().write(&out)
    }

    /// Push a level, pointing at `default_pos` (clamped).
    pub fn add_menu(&mut self, mut level: MenuLevel<T>, default_pos: usize) -> Result<()> {
        if self.screen.borrow().in_context() {
            self.cleanup()?;
        }
        level.items.set_pointer(default_pos);
        self.menus.push(level);
        if self.screen.borrow().in_context() {
            self.display(false, false)?;
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.menus.len()
    }

    pub fn active(&self) -> Option<&MenuLevel<T>> {
        self.menus.last()
    }

    /// Erase the menu and leave the application scope.
    pub fn exit(&mut self) -> Result<()> {
        self.cleanup()?;
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stop) = &self.stop {
            stop.end();
        }
        self.screen.borrow_mut().close(&self.config)
    }
}

/// The menu application: a stack of [`MenuLevel`]s over an [`XtermApp`].
pub struct Menu<T> {
    app: XtermApp,
    state: Rc<RefCell<MenuState<T>>>,
}

impl<T: Clone + 'static> Menu<T> {
    pub fn new(root: MenuLevel<T>) -> Self {
        Self::with_screen(root, Rc::new(RefCell::new(Screen::stdout())))
    }

    pub fn with_screen(root: MenuLevel<T>, screen: Rc<RefCell<Screen>>) -> Self {
        let config = XtermConfig::builder().hide_cursor(true).build();
        let state = Rc::new(RefCell::new(MenuState {
            screen: Rc::clone(&screen),
            config: config.clone(),
            stop: None,
            menus: vec![root],
        }));
        let mut app = XtermApp::new(config, screen);
        state.borrow_mut().stop = Some(app.recorder_mut().handle());
        {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .hook(move |burst: &str| state.borrow_mut().simple_nav(burst));
        }
        for key in [Key::CtrlX, Key::CtrlC] {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .bind(key, move || state.borrow_mut().exit());
        }
        Menu { app, state }
    }

    pub fn state(&self) -> Rc<RefCell<MenuState<T>>> {
        Rc::clone(&self.state)
    }

    pub fn recorder_mut(&mut self) -> &mut crate::recorder::Recorder {
        self.app.recorder_mut()
    }

    /// Enter the scope, render the root level and run until an exit key or
    /// an unbound rescue ends the recorder.
    pub fn run(&mut self) -> Result<()> {
        self.app.open()?;
        self.state.borrow_mut().display(false, false)?;
        let res = self.app.start(None);
        let closed = self.app.close();
        self.app.guard(res)?;
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::{MenuEntry, MenuLevel, Orientation};
    use crate::app::Screen;
    use crate::test::SharedSink;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn screen(sink: &SharedSink, cols: usize) -> Rc<RefCell<Screen>> {
        Rc::new(RefCell::new(Screen::with_sink(
            Box::new(sink.clone()),
            cols,
            24,
        )))
    }

    #[test]
    fn horizontal_render_uses_equal_cells() {
        let _guard = crate::test::serial();
        let sink = SharedSink::default();
        let root = MenuLevel::new(
            [
                ("alpha", MenuEntry::Value(1)),
                ("beta", MenuEntry::Value(2)),
            ],
            Orientation::Horizontal,
        )
        .with_selector(|_| Ok(()));
        let mut menu = super::Menu::with_screen(root, screen(&sink, 20));
        menu.run().unwrap();
        let out = sink.contents();
        // two cells of ten columns, the first in reverse video
        assert!(out.contains("\x1b[7malpha     \x1b[0mbeta      \r\n"));
    }

    #[test]
    fn vertical_render_joins_with_next_line() {
        let _guard = crate::test::serial();
        let sink = SharedSink::default();
        let root = MenuLevel::new(
            [
                ("one", MenuEntry::Value(1)),
                ("three", MenuEntry::Value(3)),
            ],
            Orientation::Vertical,
        )
        .with_selector(|_| Ok(()));
        let mut menu = super::Menu::with_screen(root, screen(&sink, 80));
        menu.run().unwrap();
        let out = sink.contents();
        assert!(out.contains("\x1b[7mone  \x1b[0m\x1b[Ethree\r\n"));
    }

    #[test]
    fn long_labels_are_trimmed_to_the_cell() {
        let _guard = crate::test::serial();
        let sink = SharedSink::default();
        let root = MenuLevel::new(
            [("a very long label indeed", MenuEntry::<u8>::action(|| Ok(())))],
            Orientation::Horizontal,
        );
        let mut menu = super::Menu::with_screen(root, screen(&sink, 10));
        menu.run().unwrap();
        assert!(sink.contents().contains("a very ..."));
    }

    #[test]
    fn cleanup_erases_one_line_per_vertical_item() {
        let _guard = crate::test::serial();
        let sink = SharedSink::default();
        let root = MenuLevel::new(
            [
                ("x", MenuEntry::Value(0)),
                ("y", MenuEntry::Value(1)),
                ("z", MenuEntry::Value(2)),
            ],
            Orientation::Vertical,
        )
        .with_selector(|_| Ok(()));
        let mut menu = super::Menu::with_screen(root, screen(&sink, 80));
        menu.recorder_mut().term_mut().feed_str("\x1b[B");
        menu.run().unwrap();
        assert!(sink
            .contents()
            .contains("\x1b[0J\x1b[F\x1b[2K\x1b[F\x1b[2K\x1b[F\x1b[2K"));
    }
}
