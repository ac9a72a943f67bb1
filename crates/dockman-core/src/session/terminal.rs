//! Turning raw TTY output into display lines
//!
//! [`OutputAssembler`] is fed arbitrary byte chunks. It decodes UTF-8 across
//! chunk boundaries, splits on `\r\n`, `\n` or `\r`, expands tabs, applies
//! backspaces and strips escape sequences. SGR colour sequences are kept in
//! the styled text so the renderer can turn them into styled spans; screen
//! control sequences surface as [`TermEvent`]s.

const TAB_WIDTH: usize = 8;
const ESC: char = '\x1b';

/// One completed line of output
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermLine {
    /// Text with SGR sequences preserved
    pub styled: String,
    /// Text with every escape sequence removed
    pub plain: String,
}

impl TermLine {
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            styled: text.clone(),
            plain: text,
        }
    }
}

/// What the assembler found in a chunk, in stream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    Line(TermLine),
    /// `ESC[2J`, `ESC[3J` or `ESC c`
    ClearScreen,
    /// `ESC[H` / `ESC[1;1H`
    CursorHome,
    /// `ESC[?1049h` or `ESC[?47h`
    EnterAltScreen,
    /// `ESC[?1049l` or `ESC[?47l`
    LeaveAltScreen,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Char(char),
    Sgr(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
enum EscState {
    #[default]
    Ground,
    Escape,
    Csi(String),
    Osc { saw_esc: bool },
    Charset,
}

/// Incremental TTY output decoder
#[derive(Debug, Default)]
pub struct OutputAssembler {
    utf8_pending: Vec<u8>,
    line: Vec<Piece>,
    pending_cr: bool,
    esc: EscState,
}

impl OutputAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return whatever completed
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TermEvent> {
        let mut events = Vec::new();
        let text = self.decode(bytes);
        for c in text.chars() {
            self.push_char(c, &mut events);
        }
        events
    }

    /// Emit the unterminated tail as a line (stream ended)
    pub fn flush(&mut self) -> Vec<TermEvent> {
        let mut events = Vec::new();
        if !self.utf8_pending.is_empty() {
            self.utf8_pending.clear();
            self.line.push(Piece::Char('\u{FFFD}'));
        }
        self.pending_cr = false;
        self.esc = EscState::Ground;
        if self.line.iter().any(|p| matches!(p, Piece::Char(_))) {
            events.push(TermEvent::Line(self.take_line()));
        } else {
            self.line.clear();
        }
        events
    }

    /// The current unterminated line, typically the shell's prompt
    pub fn partial(&self) -> TermLine {
        render(&self.line)
    }

    /// Drop the unterminated tail
    pub fn discard_partial(&mut self) {
        self.line.clear();
        self.pending_cr = false;
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        self.utf8_pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut rest: &[u8] = &self.utf8_pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix decodes
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            rest = &after[bad..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.utf8_pending = rest.to_vec();
        out
    }

    fn push_char(&mut self, c: char, events: &mut Vec<TermEvent>) {
        match std::mem::take(&mut self.esc) {
            EscState::Ground => self.ground(c, events),
            EscState::Escape => self.escape(c, events),
            EscState::Csi(mut params) => {
                if ('\x40'..='\x7e').contains(&c) {
                    self.finish_csi(&params, c, events);
                } else if params.len() < 64 {
                    params.push(c);
                    self.esc = EscState::Csi(params);
                }
            }
            EscState::Osc { saw_esc } => {
                if c == '\x07' || (saw_esc && c == '\\') {
                    return;
                }
                self.esc = EscState::Osc { saw_esc: c == ESC };
            }
            EscState::Charset => {}
        }
    }

    fn ground(&mut self, c: char, events: &mut Vec<TermEvent>) {
        if self.pending_cr {
            self.pending_cr = false;
            events.push(TermEvent::Line(self.take_line()));
            if c == '\n' {
                return;
            }
        }
        match c {
            ESC => self.esc = EscState::Escape,
            '\r' => self.pending_cr = true,
            '\n' => events.push(TermEvent::Line(self.take_line())),
            '\t' => {
                let col = self.column();
                let spaces = TAB_WIDTH - col % TAB_WIDTH;
                for _ in 0..spaces {
                    self.line.push(Piece::Char(' '));
                }
            }
            '\x08' => {
                if let Some(pos) = self.line.iter().rposition(|p| matches!(p, Piece::Char(_))) {
                    self.line.remove(pos);
                }
            }
            c if c.is_control() => {}
            c => self.line.push(Piece::Char(c)),
        }
    }

    fn escape(&mut self, c: char, events: &mut Vec<TermEvent>) {
        match c {
            '[' => self.esc = EscState::Csi(String::new()),
            ']' => self.esc = EscState::Osc { saw_esc: false },
            '(' | ')' | '*' | '+' => self.esc = EscState::Charset,
            'c' => {
                self.line.clear();
                events.push(TermEvent::ClearScreen);
            }
            _ => {}
        }
    }

    fn finish_csi(&mut self, params: &str, final_byte: char, events: &mut Vec<TermEvent>) {
        match final_byte {
            'm' => self.line.push(Piece::Sgr(format!("\x1b[{}m", params))),
            'H' | 'f' if matches!(params, "" | "1;1" | ";" | "1" | "1;") => {
                self.line.clear();
                events.push(TermEvent::CursorHome);
            }
            'J' if matches!(params, "2" | "3") => {
                self.line.clear();
                events.push(TermEvent::ClearScreen);
            }
            'h' if matches!(params, "?1049" | "?47" | "?1047") => {
                self.line.clear();
                events.push(TermEvent::EnterAltScreen);
            }
            'l' if matches!(params, "?1049" | "?47" | "?1047") => {
                self.line.clear();
                events.push(TermEvent::LeaveAltScreen);
            }
            _ => {}
        }
    }

    fn column(&self) -> usize {
        self.line
            .iter()
            .filter(|p| matches!(p, Piece::Char(_)))
            .count()
    }

    fn take_line(&mut self) -> TermLine {
        let line = render(&self.line);
        self.line.clear();
        line
    }
}

fn render(pieces: &[Piece]) -> TermLine {
    let mut line = TermLine::default();
    for piece in pieces {
        match piece {
            Piece::Char(c) => {
                line.styled.push(*c);
                line.plain.push(*c);
            }
            Piece::Sgr(seq) => line.styled.push_str(seq),
        }
    }
    line
}

/// Remove every escape sequence from already-split text
pub fn strip_escapes(text: &str) -> String {
    let mut assembler = OutputAssembler::new();
    let mut out = Vec::new();
    for event in assembler.feed(text.as_bytes()) {
        if let TermEvent::Line(line) = event {
            out.push(line.plain);
        }
    }
    let tail = assembler.partial();
    if !tail.plain.is_empty() || out.is_empty() {
        out.push(tail.plain);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(events: &[TermEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                TermEvent::Line(l) => Some(l.plain.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_line_splitting() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"one\r\ntwo\nthree\rfour\r\n");
        assert_eq!(lines(&events), vec!["one", "two", "three", "four"]);
        assert_eq!(asm.partial(), TermLine::default());
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut asm = OutputAssembler::new();
        assert!(lines(&asm.feed(b"hello\r")).is_empty());
        let events = asm.feed(b"\nworld\n");
        assert_eq!(lines(&events), vec!["hello", "world"]);
    }

    #[test]
    fn test_utf8_across_chunks() {
        let mut asm = OutputAssembler::new();
        let bytes = "héllo\n".as_bytes();
        let (a, b) = bytes.split_at(2);
        assert!(asm.feed(a).is_empty());
        assert_eq!(lines(&asm.feed(b)), vec!["héllo"]);
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"bad \xff byte\n");
        assert_eq!(lines(&events), vec!["bad \u{FFFD} byte"]);
    }

    #[test]
    fn test_sgr_kept_other_escapes_stripped() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"\x1b[1;32mgreen\x1b[0m \x1b[2Kplain\x1b]0;title\x07!\n");
        match &events[..] {
            [TermEvent::Line(line)] => {
                assert_eq!(line.plain, "green plain!");
                assert_eq!(line.styled, "\x1b[1;32mgreen\x1b[0m plain!");
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_tab_expansion() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"a\tb\tc\n12345678\tx\n");
        assert_eq!(lines(&events), vec!["a       b       c", "12345678        x"]);
    }

    #[test]
    fn test_backspace() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"lss\x08 \x08\n");
        assert_eq!(lines(&events), vec!["ls"]);
    }

    #[test]
    fn test_screen_control_events() {
        let mut asm = OutputAssembler::new();
        let events = asm.feed(b"\x1b[?1049h\x1b[H\x1b[2Jframe\n\x1b[?1049l");
        assert_eq!(
            events,
            vec![
                TermEvent::EnterAltScreen,
                TermEvent::CursorHome,
                TermEvent::ClearScreen,
                TermEvent::Line(TermLine::plain("frame")),
                TermEvent::LeaveAltScreen,
            ]
        );
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut asm = OutputAssembler::new();
        assert!(asm.feed(b"a\x1b[3").is_empty());
        let events = asm.feed(b"1mb\n");
        match &events[..] {
            [TermEvent::Line(line)] => {
                assert_eq!(line.plain, "ab");
                assert_eq!(line.styled, "a\x1b[31mb");
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_partial_prompt_and_flush() {
        let mut asm = OutputAssembler::new();
        asm.feed(b"output\nroot@box:/# ");
        assert_eq!(asm.partial().plain, "root@box:/# ");
        assert_eq!(lines(&asm.flush()), vec!["root@box:/# "]);
        assert!(asm.flush().is_empty());
    }

    #[test]
    fn test_strip_escapes() {
        assert_eq!(strip_escapes("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_escapes("a\tb"), "a       b");
    }
}
