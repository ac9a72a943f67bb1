//! Log view state: bounded buffer, filter matches and severity tags

use super::buffer::LineBuffer;
use super::scroll::Viewport;
use dockman_provider::ContainerId;

/// Default number of trailing lines the filter searches
pub const DEFAULT_FILTER_WINDOW: usize = 200;

/// Severity tag assigned to a log line at render time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    /// First matching tag in priority order ERROR/FATAL, WARN, INFO, DEBUG
    pub fn classify(line: &str) -> Option<Self> {
        let upper = line.to_uppercase();
        if upper.contains("ERROR") || upper.contains("FATAL") {
            Some(Self::Error)
        } else if upper.contains("WARN") {
            Some(Self::Warning)
        } else if upper.contains("INFO") {
            Some(Self::Info)
        } else if upper.contains("DEBUG") {
            Some(Self::Debug)
        } else {
            None
        }
    }
}

/// A filter hit: absolute buffer line and byte range within it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPos {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Result of stepping through matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchNav {
    /// Index of the new current match
    Moved(usize),
    /// Nothing to move to; the caller should ring the bell
    Bell,
}

/// Where the log pump stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Ended,
    Failed(String),
}

/// Byte ranges of every case-insensitive, non-overlapping occurrence of
/// `needle` in `haystack`
pub fn find_all(haystack: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    if haystack.is_ascii() && needle.is_ascii() {
        let hay = haystack.to_ascii_lowercase();
        let pat = needle.to_ascii_lowercase();
        return hay
            .match_indices(&pat)
            .map(|(start, m)| (start, start + m.len()))
            .collect();
    }

    let pattern: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    let mut found = Vec::new();
    let mut from = 0;
    while from < haystack.len() {
        match match_at(&haystack[from..], &pattern) {
            Some(len) => {
                found.push((from, from + len));
                from += len;
            }
            None => {
                from += haystack[from..].chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }
    found
}

/// Length in bytes of a case-insensitive match of `pattern` at the start of `text`
fn match_at(text: &str, pattern: &[char]) -> Option<usize> {
    let mut matched = 0;
    let mut consumed = 0;
    for c in text.chars() {
        if matched == pattern.len() {
            break;
        }
        for lower in c.to_lowercase() {
            if pattern.get(matched) != Some(&lower) {
                return None;
            }
            matched += 1;
        }
        consumed += c.len_utf8();
    }
    (matched == pattern.len()).then_some(consumed)
}

/// One open log view
#[derive(Debug)]
pub struct LogSession {
    container_id: ContainerId,
    name: String,
    buffer: LineBuffer<String>,
    filter: String,
    filter_window: usize,
    matches: Vec<MatchPos>,
    current: Option<usize>,
    state: StreamState,
    pub viewport: Viewport,
}

impl LogSession {
    pub fn new(container_id: ContainerId, name: impl Into<String>, cap: usize, filter_window: usize) -> Self {
        Self {
            container_id,
            name: name.into(),
            buffer: LineBuffer::new(cap),
            filter: String::new(),
            filter_window: filter_window.max(1),
            matches: Vec::new(),
            current: None,
            state: StreamState::Streaming,
            viewport: Viewport::default(),
        }
    }

    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.buffer.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buffer.iter().map(String::as_str)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.buffer.to_vec()
    }

    /// Append lines in arrival order
    pub fn push_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        let was_at_bottom = self.viewport.is_at_bottom(self.buffer.len());
        let mut evicted = 0;
        for line in lines {
            if self.buffer.push(line).is_some() {
                evicted += 1;
            }
        }
        self.viewport.after_append(was_at_bottom, self.buffer.len(), evicted);
        self.refilter(evicted);
    }

    pub fn push_line(&mut self, line: String) {
        self.push_lines(std::iter::once(line));
    }

    /// Record the end of the stream as an inline banner
    pub fn mark_ended(&mut self, error: Option<String>) {
        let banner = match &error {
            Some(e) => format!("--- log stream error: {} ---", e),
            None => "--- log stream ended ---".to_string(),
        };
        self.state = match error {
            Some(e) => StreamState::Failed(e),
            None => StreamState::Ended,
        };
        self.push_line(banner);
    }

    /// Clear the buffer and mark the stream live again for a new pump
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.matches.clear();
        self.current = None;
        self.state = StreamState::Streaming;
        self.viewport = Viewport::default();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Apply a new filter and select its last match
    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.current = None;
        self.refilter(0);
        self.current = self.matches.len().checked_sub(1);
        self.reveal_current();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    /// Recompute matches over the trailing filter window. The current match
    /// stays on the same text, or moves to the nearest later match once its
    /// line has left the window. `evicted` is how many lines fell off the
    /// front of the buffer since the last pass.
    fn refilter(&mut self, evicted: usize) {
        let selected = self.current_match_pos().map(|m| match m.line.checked_sub(evicted) {
            Some(line) => (line, m.start),
            None => (0, 0),
        });
        self.matches.clear();
        self.current = None;
        if self.filter.is_empty() {
            return;
        }
        let start = self.buffer.len().saturating_sub(self.filter_window);
        for (offset, line) in self.buffer.iter().skip(start).enumerate() {
            for (s, e) in find_all(line, &self.filter) {
                self.matches.push(MatchPos {
                    line: start + offset,
                    start: s,
                    end: e,
                });
            }
        }
        if let Some(sel) = selected {
            let found = self
                .matches
                .iter()
                .position(|m| (m.line, m.start) >= sel);
            self.current = found.or_else(|| self.matches.len().checked_sub(1));
        }
    }

    pub fn matches(&self) -> &[MatchPos] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn current_match(&self) -> Option<usize> {
        self.current
    }

    pub fn current_match_pos(&self) -> Option<MatchPos> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    /// Matches on one line, with a flag for the current one
    pub fn matches_on_line(&self, line: usize) -> impl Iterator<Item = (MatchPos, bool)> + '_ {
        self.matches
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.line == line)
            .map(move |(i, m)| (*m, Some(i) == self.current))
    }

    pub fn next_match(&mut self) -> MatchNav {
        if self.matches.is_empty() {
            return MatchNav::Bell;
        }
        let next = match self.current {
            Some(c) => (c + 1) % self.matches.len(),
            None => 0,
        };
        self.current = Some(next);
        self.reveal_current();
        MatchNav::Moved(next)
    }

    pub fn prev_match(&mut self) -> MatchNav {
        if self.matches.is_empty() {
            return MatchNav::Bell;
        }
        let prev = match self.current {
            Some(c) if c > 0 => c - 1,
            _ => self.matches.len() - 1,
        };
        self.current = Some(prev);
        self.reveal_current();
        MatchNav::Moved(prev)
    }

    fn reveal_current(&mut self) {
        if let Some(pos) = self.current_match_pos() {
            self.viewport.reveal(pos.line, self.buffer.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(lines: &[&str]) -> LogSession {
        let mut session = LogSession::new(ContainerId::new("abc"), "web", 1000, 200);
        session.push_lines(lines.iter().map(|l| l.to_string()));
        session
    }

    #[test]
    fn test_severity_priority() {
        assert_eq!(Severity::classify("ERROR and WARN"), Some(Severity::Error));
        assert_eq!(Severity::classify("fatal: boom"), Some(Severity::Error));
        assert_eq!(Severity::classify("warning: disk"), Some(Severity::Warning));
        assert_eq!(Severity::classify("[info] warn later"), Some(Severity::Warning));
        assert_eq!(Severity::classify("Info only"), Some(Severity::Info));
        assert_eq!(Severity::classify("debug trace"), Some(Severity::Debug));
        assert_eq!(Severity::classify("plain"), None);
    }

    #[test]
    fn test_find_all_case_insensitive() {
        assert_eq!(find_all("Error error ERROR", "error"), vec![(0, 5), (6, 11), (12, 17)]);
        assert_eq!(find_all("aaaa", "aa"), vec![(0, 2), (2, 4)]);
        assert_eq!(find_all("nothing", ""), vec![]);
        assert_eq!(find_all("Grüße GRÜSSE grüße", "grüße"), vec![(0, 7), (16, 23)]);
        assert_eq!(find_all("ÀB àb", "àb"), vec![(0, 3), (4, 7)]);
    }

    #[test]
    fn test_filter_then_navigate() {
        let mut session = session_with(&["a error", "b", "a info error"]);
        session.set_filter("error");

        assert_eq!(session.match_count(), 2);
        assert_eq!(
            session.matches(),
            &[
                MatchPos { line: 0, start: 2, end: 7 },
                MatchPos { line: 2, start: 7, end: 12 },
            ]
        );

        let before = session.current_match();
        assert_eq!(before, Some(1));
        session.next_match();
        assert_eq!(session.current_match(), Some(0));
        session.prev_match();
        assert_eq!(session.current_match(), before);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut session = session_with(&["x", "x", "x"]);
        session.set_filter("X");
        assert_eq!(session.current_match(), Some(2));
        assert_eq!(session.next_match(), MatchNav::Moved(0));
        assert_eq!(session.prev_match(), MatchNav::Moved(2));
        assert_eq!(session.prev_match(), MatchNav::Moved(1));
    }

    #[test]
    fn test_zero_matches_rings_bell() {
        let mut session = session_with(&["alpha", "beta"]);
        session.set_filter("gamma");
        assert_eq!(session.match_count(), 0);
        assert_eq!(session.current_match(), None);
        assert_eq!(session.next_match(), MatchNav::Bell);
        assert_eq!(session.prev_match(), MatchNav::Bell);
        assert_eq!(session.current_match(), None);
    }

    #[test]
    fn test_filter_only_searches_window() {
        let mut session = LogSession::new(ContainerId::new("abc"), "web", 1000, 200);
        session.push_line("needle at the very start".to_string());
        session.push_lines((0..250).map(|i| format!("filler {}", i)));
        session.push_line("needle at the end".to_string());

        session.set_filter("needle");
        assert_eq!(session.match_count(), 1);
        assert_eq!(session.matches()[0].line, 251);
    }

    #[test]
    fn test_matches_follow_new_lines() {
        let mut session = session_with(&["one error"]);
        session.set_filter("error");
        assert_eq!(session.match_count(), 1);

        session.push_line("two error".to_string());
        assert_eq!(session.match_count(), 2);
        assert_eq!(session.current_match(), Some(0));

        let flags: Vec<bool> = session.matches_on_line(0).map(|(_, cur)| cur).collect();
        assert_eq!(flags, vec![true]);
    }

    #[test]
    fn test_current_match_survives_window_slide() {
        let mut session = LogSession::new(ContainerId::new("abc"), "web", 1000, 3);
        session.push_lines(["hit one", "hit two", "hit three"].map(String::from));
        session.set_filter("hit");
        assert_eq!(session.current_match(), Some(2));
        session.prev_match();
        assert_eq!(session.line(session.current_match_pos().unwrap().line), Some("hit two"));

        // "hit one" leaves the window; the selection stays on "hit two"
        session.push_line("plain".to_string());
        assert_eq!(session.match_count(), 2);
        let pos = session.current_match_pos().unwrap();
        assert_eq!(session.line(pos.line), Some("hit two"));

        // Once "hit two" leaves too, the nearest later match is selected
        session.push_line("plain".to_string());
        let pos = session.current_match_pos().unwrap();
        assert_eq!(session.line(pos.line), Some("hit three"));
    }

    #[test]
    fn test_current_match_survives_eviction() {
        let mut session = LogSession::new(ContainerId::new("abc"), "web", 4, 4);
        session.push_lines(["hit a", "x", "hit b", "hit c"].map(String::from));
        session.set_filter("hit");
        session.prev_match();
        assert_eq!(session.current_match_pos().unwrap().line, 2);

        session.push_line("y".to_string());
        assert_eq!(session.line(0), Some("x"));
        let pos = session.current_match_pos().unwrap();
        assert_eq!(pos.line, 1);
        assert_eq!(session.line(pos.line), Some("hit b"));
    }

    #[test]
    fn test_buffer_cap_and_autoscroll() {
        let mut session = LogSession::new(ContainerId::new("abc"), "web", 1000, 200);
        session.viewport.set_height(20, 0);
        session.push_lines((0..1200).map(|i| format!("line {}", i)));

        assert_eq!(session.len(), 1000);
        assert_eq!(session.line(0), Some("line 200"));
        assert!(session.viewport.is_at_bottom(session.len()));

        session.viewport.scroll_up(100);
        let offset = session.viewport.offset();
        session.push_line("new".to_string());
        assert_eq!(session.viewport.offset(), offset - 1);
        assert!(!session.viewport.is_at_bottom(session.len()));
    }

    #[test]
    fn test_stream_end_banner() {
        let mut session = session_with(&["hello"]);
        session.mark_ended(Some("connection reset".to_string()));
        assert_eq!(session.state(), &StreamState::Failed("connection reset".to_string()));
        assert!(session.snapshot().last().unwrap().contains("connection reset"));
    }
}
