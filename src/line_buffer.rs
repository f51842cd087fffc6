//! Single-line editor with prompt, history and width-aware redraw
use crate::keys::Key;
use crate::text::unicode_len;

/// A line buffer fed raw key bursts.
///
/// The cursor is an absolute character position measured from the start of
/// the prompt, so `pos == prompt length` means "column one of the text".
/// `key` applies one burst as an edit operation; when `send_on_enter` is set
/// an ENTER burst commits the line to history and returns it.
#[derive(Debug)]
pub struct LineBuffer {
    line: String,
    pos: usize,
    prompt: String,
    history: Vec<String>,
    history_pos: usize,
    send_on_enter: bool,
    cursor_movement: bool,
    use_history: bool,
    tab_size: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self {
            line: String::new(),
            pos: 0,
            prompt: String::new(),
            history: Vec::new(),
            history_pos: 0,
            send_on_enter: true,
            cursor_movement: true,
            use_history: true,
            tab_size: 4,
        }
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether ENTER commits the line (`key` then returns it).
    pub fn with_send_on_enter(mut self, yes: bool) -> Self {
        self.send_on_enter = yes;
        self
    }

    /// Whether arrow/home/end/word-jump bursts move the cursor.
    pub fn with_cursor_movement(mut self, yes: bool) -> Self {
        self.cursor_movement = yes;
        self
    }

    /// Whether Up/Down walk the local history.
    pub fn with_history(mut self, yes: bool) -> Self {
        self.use_history = yes;
        self
    }

    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size;
        self
    }

    /// Clear text, cursor, prompt and history position. History entries are
    /// kept.
    pub fn reset(&mut self) {
        self.line.clear();
        self.pos = 0;
        self.history_pos = 0;
        self.prompt.clear();
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Absolute cursor position in characters, prompt included.
    pub fn cursor(&self) -> usize {
        self.pos
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Replace the prompt, keeping the cursor at the same offset into the
    /// text.
    pub fn set_prompt(&mut self, prompt: &str) {
        let offset = self.pos as isize - self.prompt_chars() as isize;
        let new_len = prompt.chars().count() as isize;
        self.pos = (new_len + offset).max(0) as usize;
        self.prompt = prompt.to_string();
    }

    /// Seed an empty buffer with placeholder text, cursor parked after it.
    pub fn set_placeholder(&mut self, placeholder: &str) {
        if self.line.is_empty() {
            self.line = placeholder.to_string();
            self.pos = self.prompt_chars() + self.line_chars();
        }
    }

    fn prompt_chars(&self) -> usize {
        self.prompt.chars().count()
    }

    fn line_chars(&self) -> usize {
        self.line.chars().count()
    }

    /// Cursor offset into the text, clamped to it.
    fn true_pos(&self) -> usize {
        self.pos
            .saturating_sub(self.prompt_chars())
            .min(self.line_chars())
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.line
            .char_indices()
            .nth(char_idx)
            .map_or(self.line.len(), |(i, _)| i)
    }

    /// Move left by up to `n` columns; false when already at the prompt
    /// boundary.
    pub fn cursor_left(&mut self, n: usize) -> bool {
        let offset = self.pos.saturating_sub(self.prompt_chars());
        let valid = offset > 0;
        if valid {
            self.pos -= n.min(offset);
        }
        valid
    }

    /// Move right by up to `n` columns; false when already at the end.
    pub fn cursor_right(&mut self, n: usize) -> bool {
        let end = self.prompt_chars() + self.line_chars();
        let offset = end.saturating_sub(self.pos);
        let valid = offset > 0;
        if valid {
            self.pos += n.min(offset);
        }
        valid
    }

    /// Display the next older history entry, snapshotting the live line
    /// first.
    pub fn history_up(&mut self) {
        if self.history_pos == 0 {
            if self.history.is_empty() {
                return;
            }
            self.history.push(self.line.clone());
        } else if self.history_pos + 1 >= self.history.len() {
            return;
        }
        self.history_pos += 1;
        let idx = self.history.len() - self.history_pos - 1;
        self.line = self.history[idx].clone();
        self.pos = self.prompt_chars() + self.line_chars();
    }

    /// Walk back toward the live line, popping the snapshot on reaching it.
    pub fn history_down(&mut self) {
        if self.history_pos > 0 {
            self.history_pos -= 1;
            self.line = if self.history_pos == 0 {
                self.history.pop().unwrap_or_default()
            } else {
                self.history[self.history.len() - self.history_pos - 1].clone()
            };
            self.pos = self.prompt_chars() + self.line_chars();
        }
    }

    /// Commit the line: append it to history unless it repeats the last
    /// entry, clear the text and park the cursor at the prompt end.
    pub fn enter_send(&mut self) -> String {
        if self.history.last() != Some(&self.line) {
            if self.history_pos != 0 {
                self.history.pop();
            }
            self.history.push(self.line.clone());
        }
        let result = std::mem::take(&mut self.line);
        self.pos = self.prompt_chars();
        result
    }

    /// Insert a burst at the cursor. Accepted bursts are whitespace runs
    /// that are not an ENTER alias, or a single character at or above
    /// U+0020. The burst goes in as one unit and the cursor advances by
    /// exactly one, so pasted text with embedded tabs or newlines lands
    /// whole.
    pub fn insert(&mut self, burst: &str) {
        let whitespace = !burst.is_empty() && burst.chars().all(char::is_whitespace);
        let mut chars = burst.chars();
        let single_printable = match (chars.next(), chars.next()) {
            (Some(c), None) => c as u32 >= 0x20,
            _ => false,
        };
        if (!Key::Enter.matches(burst) && whitespace) || single_printable {
            let at = self.byte_at(self.true_pos());
            self.line.insert_str(at, burst);
            self.pos += 1;
        }
    }

    /// Cursor columns to jump for a word-left movement: to just past the
    /// previous whitespace boundary, or just past the first character when
    /// the text before the cursor is a single word.
    fn word_left_offset(&self) -> usize {
        let true_pos = self.true_pos();
        let before: Vec<char> = self.line.chars().take(true_pos).collect();
        let mut boundary = None;
        for e in (1..before.len()).rev() {
            if before[e - 1].is_whitespace() || !before[e].is_whitespace() {
                continue;
            }
            if before[e..].iter().any(|c| !c.is_whitespace()) {
                boundary = Some(e);
                break;
            }
        }
        match boundary {
            Some(e) => true_pos - e,
            None => true_pos.saturating_sub(1),
        }
    }

    /// Cursor columns to jump for a word-right movement: to the start of
    /// the next word, or to the end of the line when there is none.
    fn word_right_offset(&self) -> usize {
        let tail: Vec<char> = self.line.chars().skip(self.true_pos() + 1).collect();
        let mut run_start = None;
        for (i, c) in tail.iter().enumerate() {
            match (run_start, c.is_whitespace()) {
                (None, true) => run_start = Some(i),
                (Some(_), false) => return i + 1,
                _ => {}
            }
        }
        self.line_chars()
    }

    /// Apply one key burst. Returns the committed line when `send_on_enter`
    /// is set and the burst is an ENTER alias.
    pub fn key(&mut self, burst: &str) -> Option<String> {
        if Key::Delete.matches(burst) || Key::Backspace.matches(burst) {
            let end = self.prompt_chars() + self.line_chars();
            let removable = (Key::Delete.matches(burst) && self.pos < end)
                || (Key::Backspace.matches(burst) && self.cursor_left(1));
            if removable {
                let at = self.byte_at(self.true_pos());
                if at < self.line.len() {
                    self.line.remove(at);
                }
            }
        } else if Key::Tab.matches(burst) {
            self.insert(&" ".repeat(self.tab_size));
        } else {
            self.insert(burst);
            if self.cursor_movement {
                if Key::Right.matches(burst) {
                    self.cursor_right(1);
                } else if Key::Left.matches(burst) {
                    self.cursor_left(1);
                } else if Key::Home.matches(burst) {
                    self.cursor_left(self.line_chars());
                } else if Key::End.matches(burst) {
                    self.cursor_right(self.line_chars());
                } else if Key::CtrlLeft.matches(burst) || Key::OptLeft.matches(burst) {
                    let offset = self.word_left_offset();
                    self.cursor_left(offset);
                } else if Key::CtrlRight.matches(burst) || Key::OptRight.matches(burst) {
                    let offset = self.word_right_offset();
                    self.cursor_right(offset);
                }
            }
            if self.use_history {
                if Key::Up.matches(burst) {
                    self.history_up();
                } else if Key::Down.matches(burst) {
                    self.history_down();
                }
            }
            if self.send_on_enter && Key::Enter.matches(burst) {
                return Some(self.enter_send());
            }
        }
        None
    }

    /// Redraw string: clear the line, return to column one, write prompt
    /// and text, then place the cursor at its width-aware column.
    pub fn with_csi(&self) -> String {
        let prefix: String = self.line.chars().take(self.pos).collect();
        format!(
            "\x1b[2K\x1b[0G{}{}\x1b[{}G",
            self.prompt,
            self.line,
            unicode_len(&prefix) + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::LineBuffer;

    fn feed(buf: &mut LineBuffer, bursts: &[&str]) -> Option<String> {
        let mut sent = None;
        for burst in bursts {
            if let Some(line) = buf.key(burst) {
                sent = Some(line);
            }
        }
        sent
    }

    #[test]
    fn type_and_send() {
        let mut buf = LineBuffer::new();
        buf.set_prompt("> ");
        let sent = feed(&mut buf, &["h", "i", "\r"]);
        assert_eq!(Some("hi".to_string()), sent);
        assert_eq!("", buf.line());
        assert_eq!(2, buf.cursor());
        assert_eq!(["hi"], buf.history());
    }

    #[test]
    fn backspace_after_word_jump() {
        let mut buf = LineBuffer::new();
        buf.set_prompt("> ");
        feed(&mut buf, &["h", "e", "l", "l", "o", "\u{e0}s", "\x7f"]);
        assert_eq!("ello", buf.line());
        assert_eq!(2, buf.cursor());
        let sent = feed(&mut buf, &["\r"]);
        assert_eq!(Some("ello".to_string()), sent);
    }

    #[test]
    fn word_jumps_across_words() {
        let mut buf = LineBuffer::new();
        for c in "hello world".chars() {
            buf.key(&c.to_string());
        }
        assert_eq!(11, buf.cursor());
        buf.key("\x1bb");
        // lands just past "hello"
        assert_eq!(5, buf.cursor());
        buf.key("\x1bf");
        assert_eq!(11, buf.cursor());
    }

    #[test]
    fn delete_and_backspace_bounds() {
        let mut buf = LineBuffer::new();
        feed(&mut buf, &["a", "b"]);
        // backspace at the prompt boundary is a no-op
        buf.cursor_left(2);
        buf.key("\x7f");
        assert_eq!("ab", buf.line());
        // delete takes the character under the cursor
        buf.key("\x1b[3~");
        assert_eq!("b", buf.line());
        assert_eq!(0, buf.cursor());
        // and is a no-op at the end of the text
        buf.cursor_right(1);
        buf.key("\x1b[3~");
        assert_eq!("b", buf.line());
    }

    #[test]
    fn pasted_whitespace_goes_in_whole() {
        // a multi-character whitespace burst is inserted as one unit and
        // moves the cursor a single column
        let mut buf = LineBuffer::new();
        buf.key(" \t ");
        assert_eq!(" \t ", buf.line());
        assert_eq!(1, buf.cursor());
        // CRLF is whitespace but not an ENTER alias, so it is inserted too
        let mut buf = LineBuffer::new();
        buf.key("\r\n");
        assert_eq!("\r\n", buf.line());
    }

    #[test]
    fn tab_expands_to_spaces() {
        let mut buf = LineBuffer::new().with_tab_size(4);
        buf.key("\t");
        assert_eq!("    ", buf.line());
        assert_eq!(1, buf.cursor());
    }

    #[test]
    fn history_walk() {
        let mut buf = LineBuffer::new();
        feed(&mut buf, &["a", "\r"]);
        feed(&mut buf, &["b", "\r"]);
        feed(&mut buf, &["c"]);
        buf.key("\x1b[A");
        assert_eq!("b", buf.line());
        buf.key("\x1b[A");
        assert_eq!("a", buf.line());
        buf.key("\x1b[B");
        assert_eq!("b", buf.line());
        buf.key("\x1b[B");
        // back on the live line, snapshot popped
        assert_eq!("c", buf.line());
        assert_eq!(["a", "b"], buf.history());
    }

    #[test]
    fn history_up_on_empty_history() {
        let mut buf = LineBuffer::new();
        buf.key("\x1b[A");
        assert_eq!("", buf.line());
        assert!(buf.history().is_empty());
    }

    #[test]
    fn adjacent_duplicates_are_not_recorded() {
        let mut buf = LineBuffer::new();
        feed(&mut buf, &["x", "\r"]);
        feed(&mut buf, &["x", "\r"]);
        feed(&mut buf, &["y", "\r"]);
        assert_eq!(["x", "y"], buf.history());
    }

    #[test]
    fn csi_column_is_width_aware() {
        let mut buf = LineBuffer::new();
        buf.key("\u{4f60}"); // 你 occupies two columns
        buf.key("a");
        assert_eq!("\x1b[2K\x1b[0G\u{4f60}a\x1b[4G", buf.with_csi());
    }

    #[test]
    fn home_end_and_arrows() {
        let mut buf = LineBuffer::new();
        buf.set_prompt("? ");
        feed(&mut buf, &["a", "b", "c"]);
        buf.key("\x1b[H");
        assert_eq!(2, buf.cursor());
        buf.key("\x1b[C");
        assert_eq!(3, buf.cursor());
        buf.key("\x1b[F");
        assert_eq!(5, buf.cursor());
        buf.key("\x1b[D");
        assert_eq!(4, buf.cursor());
    }

    #[test]
    fn placeholder_fills_empty_line() {
        let mut buf = LineBuffer::new();
        buf.set_prompt("> ");
        buf.set_placeholder("type here");
        assert_eq!("type here", buf.line());
        assert_eq!(11, buf.cursor());
        buf.reset();
        buf.key("x");
        buf.set_placeholder("ignored");
        assert_eq!("x", buf.line());
    }
}
