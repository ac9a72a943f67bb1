//! Single-line text field used for the log filter

use crate::keymap::FilterEdit;

/// Text plus a cursor kept on a char boundary
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    buffer: String,
    /// Byte offset
    cursor: usize,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor is placed at the end
    pub fn with_value(value: &str) -> Self {
        Self {
            buffer: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.buffer = value.to_string();
        self.cursor = self.buffer.len();
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    pub fn before_cursor(&self) -> &str {
        &self.buffer[..self.cursor]
    }

    pub fn after_cursor(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    /// Apply one edit; returns true if the text changed
    pub fn apply(&mut self, edit: FilterEdit) -> bool {
        match edit {
            FilterEdit::Insert(c) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                true
            }
            FilterEdit::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                let prev = self.prev_boundary();
                self.buffer.remove(prev);
                self.cursor = prev;
                true
            }
            FilterEdit::Delete => {
                if self.cursor >= self.buffer.len() {
                    return false;
                }
                self.buffer.remove(self.cursor);
                true
            }
            FilterEdit::Left => {
                self.cursor = self.prev_boundary();
                false
            }
            FilterEdit::Right => {
                self.cursor = self.next_boundary();
                false
            }
            FilterEdit::Home => {
                self.cursor = 0;
                false
            }
            FilterEdit::End => {
                self.cursor = self.buffer.len();
                false
            }
        }
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.cursor)
    }
}
