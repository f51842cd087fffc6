//! Interactive fuzzy finder
//!
//! Filters candidates against a live query, renders a scrollable result
//! pane with a search line at the bottom, and returns the chosen string.
//! Matching is case-insensitive with case-preserving display; scoring
//! favors tight, case-identical matches close to the start of the item.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use memchr::memmem;

use crate::app::{Screen, XtermApp, XtermConfig};
use crate::cursor_list::CursorList;
use crate::keys::Key;
use crate::line_buffer::LineBuffer;
use crate::recorder::RecorderHandle;
use crate::text::{strip_ansi, trim};
use crate::Result;

/// Wheel-up / wheel-down in the legacy X10 encoding. Only the button byte
/// after `ESC [ M` matters, coordinates are ignored.
const WHEEL_UP: &[u8] = b"\x1b[M\x60";
const WHEEL_DOWN: &[u8] = b"\x1b[Ma";

/// Matched character positions and the score of one candidate.
type Match = (Vec<usize>, f64);

const MATCH_CACHE_LIMIT: usize = 4096;

/// Walk `query` through `item` left to right, matching each character at
/// the first position past the previous one. Case differences halve a
/// character's contribution, gaps cost a nickel a column, and the total is
/// normalized by how far into the item the match reaches.
fn fuzzy_match(query: &str, item: &str) -> Option<Match> {
    let chars: Vec<char> = item.chars().collect();
    let mut indices = Vec::new();
    let mut score = 0.0;
    let mut last: isize = -1;
    for qc in query.chars() {
        let start = (last + 1) as usize;
        let found = (start..chars.len()).find(|&i| eq_fold(chars[i], qc))?;
        indices.push(found);
        let gap = (found as isize - last - 1) as f64 * 0.05;
        score += if chars[found] != qc { 0.5 + gap } else { 1.0 + gap };
        last = found as isize;
    }
    if indices.is_empty() {
        None
    } else {
        Some((indices, score / (last + 1) as f64))
    }
}

fn eq_fold(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Mutable finder state driven by the recorder hook and bindings.
pub struct FinderState {
    screen: Rc<RefCell<Screen>>,
    config: XtermConfig,
    stop: Option<RecorderHandle>,
    objects: Vec<String>,
    sublist: CursorList<String>,
    current_query: String,
    line_buffer: LineBuffer,
    start_index: usize,
    max_lines: usize,
    receiver: Option<Box<dyn FnMut(&str)>>,
    value: Option<String>,
    cache: HashMap<(String, String), Option<Match>>,
}

impl FinderState {
    /// Count wheel reports in the burst and scroll by them; any other
    /// burst goes to the search line.
    pub fn handle_key(&mut self, burst: &str) -> Result<()> {
        let up = memmem::find_iter(burst.as_bytes(), WHEEL_UP).count();
        let down = memmem::find_iter(burst.as_bytes(), WHEEL_DOWN).count();
        self.previous_item(up)?;
        self.next_item(down)?;
        if up == 0 && down == 0 {
            self.line_buffer.key(burst);
        }
        self.search_bar()
    }

    /// Move the selection down `n` rows, scrolling just enough to keep it
    /// visible.
    pub fn next_item(&mut self, n: usize) -> Result<()> {
        if self.sublist.is_empty() {
            return Ok(());
        }
        self.highlight(self.sublist.pointer(), true)?;
        self.sublist.advance(n);
        let pointer = self.sublist.pointer();
        if pointer >= self.start_index + self.max_lines {
            self.scroll_down(pointer - self.start_index - self.max_lines + 1)?;
        }
        self.highlight(pointer, false)?;
        self.footer()?;
        self.screen.borrow_mut().flush()
    }

    /// Move the selection up `n` rows, scrolling back into view if needed.
    pub fn previous_item(&mut self, n: usize) -> Result<()> {
        if self.sublist.is_empty() {
            return Ok(());
        }
        self.highlight(self.sublist.pointer(), true)?;
        self.sublist.retreat(n);
        let pointer = self.sublist.pointer();
        if pointer < self.start_index {
            self.scroll_to_view()?;
        }
        self.highlight(pointer, false)?;
        self.footer()?;
        self.screen.borrow_mut().flush()
    }

    fn scroll_to_view(&mut self) -> Result<()> {
        let offset = self.sublist.pointer() as isize - self.start_index as isize;
        if !(0..self.max_lines as isize).contains(&offset) {
            if offset < 0 {
                self.scroll_up(offset.unsigned_abs())
            } else {
                self.scroll_down(offset as usize)
            }
        } else {
            Ok(())
        }
    }

    pub fn scroll_up(&mut self, n: usize) -> Result<()> {
        if self.start_index > 0 {
            self.start_index -= n.min(self.start_index);
            self.writelines()?;
        }
        Ok(())
    }

    pub fn scroll_down(&mut self, n: usize) -> Result<()> {
        let total = self.sublist.len();
        if self.start_index + self.max_lines < total {
            self.start_index += n.min(total - self.start_index - self.max_lines);
            self.writelines()?;
        }
        Ok(())
    }

    /// Re-filter when the query changed, then redraw the search line.
    pub fn search_bar(&mut self) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        let query = self.line_buffer.line().to_string();
        if query != self.current_query {
            self.current_query = query.clone();
            if query.is_empty() {
                self.sublist = CursorList::new(self.objects.clone(), false);
                self.start_index = 0;
                self.writelines()?;
                self.highlight(0, false)?;
            } else {
                let objects = self.objects.clone();
                let mut scored: Vec<(String, f64)> = objects
                    .into_iter()
                    .filter_map(|obj| {
                        let score = self.matches_query(&query, &obj)?.1;
                        Some((obj, score))
                    })
                    .collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                self.sublist =
                    CursorList::new(scored.into_iter().map(|(obj, _)| obj), false);
                self.start_index = 0;
                self.clear()?;
                self.writelines()?;
                self.highlight(0, false)?;
            }
        }
        let (_, rows) = self.screen.borrow().size();
        self.write(&format!("\x1b[{rows};0H\x1b[2K"))?;
        self.write(&self.line_buffer.with_csi())?;
        self.screen.borrow_mut().flush()
    }

    /// Paint (or unpaint) the row for `index`, saving and restoring the
    /// cursor around the excursion.
    pub fn highlight(&mut self, index: usize, unhighlight: bool) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        if index < self.sublist.len() {
            let (cols, _) = self.screen.borrow().size();
            let row = 1 + index.saturating_sub(self.start_index);
            let item = self.sublist[index].clone();
            self.write(&format!("\x1b7\x1b[{row};0H"))?;
            if unhighlight {
                let line = self.format_normal_line(&item, cols);
                self.write(&format!("\x1b[0K{line}"))?;
            } else {
                let line = format!(
                    "\x1b[48;5;22m \x1b[2;39m\u{2590}\x1b[22m \x1b[31;1m>\x1b[39;22m {}",
                    self.format_item(&item)
                );
                self.write(&rjust_line(&line, cols))?;
                self.write("\x1b[0m")?;
            }
            self.write("\x1b8")?;
        }
        Ok(())
    }

    /// Redraw the whole result pane, or the `(EMPTY)` banner.
    pub fn writelines(&mut self) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        self.footer()?;
        if self.sublist.is_empty() {
            self.clear()?;
            self.write("\x1b[0;0H\x1b[7m(EMPTY)\x1b[0m")?;
        } else {
            self.write("\x1b[0;0H\x1b[2K")?;
            let (cols, _) = self.screen.borrow().size();
            let end = (self.start_index + self.max_lines).min(self.sublist.len());
            let window: Vec<String> = self.sublist[self.start_index..end].to_vec();
            let rendered: Vec<String> = window
                .iter()
                .map(|item| self.format_normal_line(item, cols))
                .collect();
            self.write(&rendered.join("\x1b[E\x1b[2K"))?;
            self.screen.borrow_mut().flush()?;
        }
        Ok(())
    }

    /// `pointer/first-last/total` padded with box-drawing dashes.
    pub fn footer(&mut self) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        let (cols, rows) = self.screen.borrow().size();
        self.write(&format!("\x1b[{};0H", rows - 1))?;
        let total = self.sublist.len();
        let display_count = self.max_lines.min(total);
        let start = self.start_index;
        let count = format!(
            "{}/{}-{}/{} ",
            self.sublist.pointer() + 1,
            if total > 0 { start + 1 } else { 0 },
            start + display_count,
            total
        );
        self.write(&format!("{count:\u{2500}<cols$}"))
    }

    fn clear(&mut self) -> Result<()> {
        if !self.screen.borrow().in_context() {
            return Ok(());
        }
        let body = "\x1b[E\x1b[2K".repeat(self.max_lines.saturating_sub(1));
        self.write(&format!("\x1b[0;0H\x1b[2K{body}"))
    }

    /// Commit the pointed item: end the recorder, record the value, notify
    /// the receiver.
    pub fn send(&mut self) -> Result<()> {
        if !self.sublist.is_empty() {
            if let Some(stop) = &self.stop {
                stop.end();
            }
            let value = self.sublist.current().cloned();
            self.value.clone_from(&value);
            if let (Some(receiver), Some(value)) = (self.receiver.as_mut(), value.as_deref()) {
                receiver(value);
            }
        }
        Ok(())
    }

    /// Abort with no value and leave the application scope.
    pub fn exit(&mut self) -> Result<()> {
        self.value = None;
        if let Some(stop) = &self.stop {
            stop.end();
        }
        self.screen.borrow_mut().close(&self.config)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn pointer(&self) -> usize {
        self.sublist.pointer()
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn results(&self) -> &[String] {
        &self.sublist
    }

    fn matches_query(&mut self, query: &str, item: &str) -> Option<Match> {
        let key = (query.to_string(), item.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let result = fuzzy_match(query, item);
        if self.cache.len() >= MATCH_CACHE_LIMIT {
            self.cache.clear();
        }
        self.cache.insert(key, result.clone());
        result
    }

    fn format_normal_line(&mut self, item: &str, length: usize) -> String {
        let trimmed = trim(item, length.saturating_sub(5)).into_owned();
        format!(
            " \x1b[2;39m\u{2590}\x1b[0m   {}",
            self.format_item(&trimmed)
        )
    }

    /// Wrap every matched character of `item` in the highlight color.
    fn format_item(&mut self, item: &str) -> String {
        let query = self.current_query.clone();
        if query.is_empty() {
            return item.to_string();
        }
        match self.matches_query(&query, item) {
            Some((indices, _)) => {
                let mut out = String::new();
                for (i, c) in item.chars().enumerate() {
                    if indices.binary_search(&i).is_ok() {
                        out.push_str("\x1b[1;36m");
                        out.push(c);
                        out.push_str("\x1b[22;39m");
                    } else {
                        out.push(c);
                    }
                }
                out
            }
            None => item.to_string(),
        }
    }

    fn write(&self, s: &str) -> Result<()> {
        self.screen.borrow_mut().write(s)
    }
}

/// Pad `item` with spaces to the full terminal width, measuring only its
/// visible characters.
fn rjust_line(item: &str, cols: usize) -> String {
    let visible = strip_ansi(item).chars().count();
    format!("{item}{}", " ".repeat(cols.saturating_sub(visible)))
}

/// The fuzzy-finder application.
pub struct FuzzyFinder {
    app: XtermApp,
    state: Rc<RefCell<FinderState>>,
}

impl FuzzyFinder {
    pub fn new(objects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_screen(objects, Rc::new(RefCell::new(Screen::stdout())))
    }

    pub fn with_screen(
        objects: impl IntoIterator<Item = impl Into<String>>,
        screen: Rc<RefCell<Screen>>,
    ) -> Self {
        let objects: Vec<String> = objects.into_iter().map(Into::into).collect();
        let config = XtermConfig::builder()
            .alternate_buffer(true)
            .alternate_scroll(true)
            .auto_wrap(false)
            .mouse_events(true)
            .build();
        let (_, rows) = screen.borrow().size();
        let state = Rc::new(RefCell::new(FinderState {
            screen: Rc::clone(&screen),
            config: config.clone(),
            stop: None,
            sublist: CursorList::new(objects.clone(), false),
            objects,
            current_query: String::new(),
            line_buffer: LineBuffer::new().with_send_on_enter(false).with_history(false),
            start_index: 0,
            max_lines: rows.saturating_sub(2),
            receiver: None,
            value: None,
            cache: HashMap::new(),
        }));
        let mut app = XtermApp::new(config, screen);
        state.borrow_mut().stop = Some(app.recorder_mut().handle());
        {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .hook(move |burst: &str| state.borrow_mut().handle_key(burst));
        }
        for key in [Key::CtrlC, Key::CtrlD] {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .bind(key, move || state.borrow_mut().exit());
        }
        {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .bind(Key::Down, move || state.borrow_mut().next_item(1));
        }
        {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .bind(Key::Up, move || state.borrow_mut().previous_item(1));
        }
        {
            let state = Rc::clone(&state);
            app.recorder_mut().bind(Key::PageDown, move || {
                let n = state.borrow().objects.len();
                state.borrow_mut().next_item(n)
            });
        }
        {
            let state = Rc::clone(&state);
            app.recorder_mut().bind(Key::PageUp, move || {
                let n = state.borrow().objects.len();
                state.borrow_mut().previous_item(n)
            });
        }
        {
            let state = Rc::clone(&state);
            app.recorder_mut()
                .bind(Key::Enter, move || state.borrow_mut().send());
        }
        FuzzyFinder { app, state }
    }

    /// Call `receiver` with the committed value.
    #[must_use]
    pub fn with_receiver(self, receiver: impl FnMut(&str) + 'static) -> Self {
        self.state.borrow_mut().receiver = Some(Box::new(receiver));
        self
    }

    pub fn state(&self) -> Rc<RefCell<FinderState>> {
        Rc::clone(&self.state)
    }

    pub fn recorder_mut(&mut self) -> &mut crate::recorder::Recorder {
        self.app.recorder_mut()
    }

    /// Run the finder; `Ok(Some(_))` is the committed choice, `Ok(None)`
    /// an abort.
    pub fn run(&mut self) -> Result<Option<String>> {
        self.app.open()?;
        {
            let mut state = self.state.borrow_mut();
            state.footer()?;
            state.writelines()?;
            let pointer = state.sublist.pointer();
            state.highlight(pointer, false)?;
            state.search_bar()?;
            state.screen.borrow_mut().flush()?;
        }
        let res = self.app.start(None);
        let closed = self.app.close();
        self.app.guard(res)?;
        closed?;
        let value = self.state.borrow().value.clone();
        Ok(value)
    }
}
