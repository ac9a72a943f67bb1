//! Line editing for the shell prompt
//!
//! The UI maps its key events to [`ShellKey`] and hands them to
//! [`ShellLineEditor::translate`]; nothing is sent to the container until a
//! line is submitted.

/// Keys the shell prompt understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKey {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Up,
    Down,
    Enter,
    /// Ctrl+U
    ClearLine,
    /// Ctrl+W
    DeleteWord,
}

/// What a key did to the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Edited,
    Submit(String),
}

/// Maximum number of commands remembered per session
pub const HISTORY_LIMIT: usize = 500;

/// Command history, oldest first
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn push(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        self.entries.push(command.to_string());
        if self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Editable input line with a cursor and a history cursor
#[derive(Debug, Clone, Default)]
pub struct ShellLineEditor {
    text: String,
    /// Cursor position in chars
    cursor: usize,
    history_pos: Option<usize>,
}

impl ShellLineEditor {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history_pos(&self) -> Option<usize> {
        self.history_pos
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.history_pos = None;
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Apply one key
    pub fn translate(&mut self, key: ShellKey, history: &History) -> EditorAction {
        match key {
            ShellKey::Char(c) => {
                let at = self.byte_index(self.cursor);
                self.text.insert(at, c);
                self.cursor += 1;
                EditorAction::Edited
            }
            ShellKey::Backspace => {
                if self.cursor == 0 {
                    return EditorAction::None;
                }
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
                EditorAction::Edited
            }
            ShellKey::Delete => {
                if self.cursor >= self.text.chars().count() {
                    return EditorAction::None;
                }
                let at = self.byte_index(self.cursor);
                self.text.remove(at);
                EditorAction::Edited
            }
            ShellKey::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                EditorAction::None
            }
            ShellKey::Right => {
                self.cursor = (self.cursor + 1).min(self.text.chars().count());
                EditorAction::None
            }
            ShellKey::Home => {
                self.cursor = 0;
                EditorAction::None
            }
            ShellKey::End => {
                self.cursor = self.text.chars().count();
                EditorAction::None
            }
            ShellKey::ClearLine => {
                self.text.clear();
                self.cursor = 0;
                EditorAction::Edited
            }
            ShellKey::DeleteWord => {
                let end = self.byte_index(self.cursor);
                let before = &self.text[..end];
                let trimmed = before.trim_end();
                let start = trimmed
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(0);
                let removed = self.text[start..end].chars().count();
                self.text.replace_range(start..end, "");
                self.cursor -= removed;
                EditorAction::Edited
            }
            ShellKey::Up => self.history_up(history),
            ShellKey::Down => self.history_down(history),
            ShellKey::Enter => {
                let line = std::mem::take(&mut self.text);
                self.cursor = 0;
                self.history_pos = None;
                EditorAction::Submit(line)
            }
        }
    }

    /// Older entry; stays on the oldest once reached
    fn history_up(&mut self, history: &History) -> EditorAction {
        if history.is_empty() {
            return EditorAction::None;
        }
        let pos = match self.history_pos {
            None => history.len() - 1,
            Some(p) => p.saturating_sub(1),
        };
        self.recall(pos, history)
    }

    /// Newer entry; past the newest the line goes back to empty
    fn history_down(&mut self, history: &History) -> EditorAction {
        match self.history_pos {
            None => EditorAction::None,
            Some(p) if p + 1 < history.len() => self.recall(p + 1, history),
            Some(_) => {
                self.history_pos = None;
                self.text.clear();
                self.cursor = 0;
                EditorAction::Edited
            }
        }
    }

    fn recall(&mut self, pos: usize, history: &History) -> EditorAction {
        self.history_pos = Some(pos);
        let entry = history.get(pos).unwrap_or_default().to_string();
        self.set_text(&entry);
        EditorAction::Edited
    }
}
