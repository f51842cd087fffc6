//! Ordered sequence with an internal cursor
use std::ops::Deref;

/// A list with a pointer that can be advanced or retreated, either wrapping
/// around the ends (`cyclic`) or clamping to them.
///
/// Menus and result lists share this cursor. On a non-empty list the pointer
/// always stays in `[0, len)`; on an empty list it is 0 and navigation is a
/// no-op.
#[derive(Debug, Clone)]
pub struct CursorList<T> {
    items: Vec<T>,
    pointer: usize,
    cyclic: bool,
}

impl<T> CursorList<T> {
    pub fn new(items: impl IntoIterator<Item = T>, cyclic: bool) -> Self {
        Self {
            items: items.into_iter().collect(),
            pointer: 0,
            cyclic,
        }
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Set the pointer, clamping anything past the end to the last element.
    pub fn set_pointer(&mut self, pos: usize) {
        if self.items.is_empty() {
            self.pointer = 0;
        } else if pos >= self.items.len() {
            self.pointer = self.items.len() - 1;
        } else {
            self.pointer = pos;
        }
    }

    /// Move the pointer `n` steps forward and return its new value.
    pub fn advance(&mut self, n: usize) -> usize {
        let len = self.items.len();
        if len > 0 {
            self.pointer = if self.cyclic {
                (self.pointer + n) % len
            } else {
                (self.pointer + n).min(len - 1)
            };
        }
        self.pointer
    }

    /// Move the pointer `n` steps back and return its new value.
    pub fn retreat(&mut self, n: usize) -> usize {
        let len = self.items.len();
        if len > 0 {
            self.pointer = if self.cyclic {
                let n = n % len;
                (self.pointer + len - n) % len
            } else {
                self.pointer.saturating_sub(n)
            };
        }
        self.pointer
    }

    /// True when a clamping list has its pointer on the last element.
    pub fn at_end(&self) -> bool {
        !self.cyclic && !self.items.is_empty() && self.pointer == self.items.len() - 1
    }

    /// The element under the pointer.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.pointer)
    }
}

impl<T> Deref for CursorList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}
