//! Line-oriented screen buffer with bounded scrollback.
//!
//! [`Screen`] turns a raw byte stream into complete lines. It understands just
//! enough of the terminal protocol to keep captured output readable: newlines,
//! carriage returns, backspace, tabs, and skipping CSI/OSC escape sequences.
//! Everything else a real emulator would interpret is dropped.

use std::collections::VecDeque;

use crate::adapter::TerminalSize;
use crate::scroll::ScrollState;

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeState {
    Ground,
    Escape,
    /// `ESC (` / `ESC )` charset designation, one more char to skip
    Charset,
    Csi,
    Osc,
    /// Saw `ESC` inside an OSC string (start of the `ESC \` terminator)
    OscEscape,
}

/// Screen contents and viewport for one pane.
#[derive(Debug)]
pub struct Screen {
    /// Completed lines, oldest first
    lines: VecDeque<String>,
    /// Line currently being written
    current: String,
    /// A `\r` was seen; the next printable char overwrites the current line
    carriage_return: bool,
    escape: EscapeState,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk
    pending: Vec<u8>,
    /// Maximum number of completed lines kept
    max_lines: usize,
    size: TerminalSize,
    scroll: ScrollState,
}

impl Screen {
    pub fn new(size: TerminalSize, max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            current: String::new(),
            carriage_return: false,
            escape: EscapeState::Ground,
            pending: Vec::new(),
            max_lines: max_lines.max(1),
            size,
            scroll: ScrollState::new(),
        }
    }

    /// Append raw process output.
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        let before = self.line_count();
        let mut evicted = 0;
        let mut input: &[u8] = &data;
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    evicted += self.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        evicted += self.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            evicted += self.push_char(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of the chunk
                            self.pending = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        // The unterminated line counts as soon as it is visible
        let added = (self.line_count() + evicted).saturating_sub(before);
        let max_scroll = self.max_scroll();
        self.scroll.follow_output(added, max_scroll);
    }

    /// Drop all content and return to following live output.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.carriage_return = false;
        self.escape = EscapeState::Ground;
        self.pending.clear();
        self.scroll.reset();
    }

    pub fn resize(&mut self, size: TerminalSize) {
        self.size = size;
        let max_scroll = self.max_scroll();
        self.scroll.clamp_to_scrollback(max_scroll);
    }

    pub fn size(&self) -> TerminalSize {
        self.size
    }

    /// Number of lines held, including an unterminated last line.
    pub fn line_count(&self) -> usize {
        self.lines.len() + usize::from(!self.current.is_empty())
    }

    /// How far the viewport can move above the live edge.
    pub fn max_scroll(&self) -> usize {
        self.line_count()
            .saturating_sub(usize::from(self.size.rows))
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.max_scroll();
        self.scroll.scroll_up(lines, max_scroll);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll.scroll_down(lines);
    }

    pub fn scroll_reset(&mut self) {
        self.scroll.reset();
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll.offset()
    }

    pub fn is_scrolling(&self) -> bool {
        self.scroll.is_scrolling()
    }

    pub fn scrollable(&self) -> bool {
        self.max_scroll() > 0
    }

    /// Lines currently inside the viewport, top to bottom.
    pub fn visible_lines(&self) -> Vec<String> {
        let all: Vec<&str> = self
            .lines
            .iter()
            .map(String::as_str)
            .chain((!self.current.is_empty()).then_some(self.current.as_str()))
            .collect();
        let end = all.len().saturating_sub(self.scroll.offset());
        let start = end.saturating_sub(usize::from(self.size.rows));
        all[start..end].iter().map(|s| s.to_string()).collect()
    }

    /// Full buffer as text, one line per row.
    pub fn content(&self) -> String {
        let mut out: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        if !self.current.is_empty() {
            out.push(&self.current);
        }
        out.join("\n")
    }

    /// Returns the number of lines evicted from the front of the scrollback.
    fn push_str(&mut self, text: &str) -> usize {
        text.chars().map(|c| self.push_char(c)).sum()
    }

    fn push_char(&mut self, c: char) -> usize {
        match self.escape {
            EscapeState::Ground => match c {
                '\x1b' => self.escape = EscapeState::Escape,
                '\n' => return self.newline(),
                '\r' => self.carriage_return = true,
                '\x08' => {
                    self.current.pop();
                }
                '\t' => {
                    let pad = TAB_WIDTH - self.current.chars().count() % TAB_WIDTH;
                    for _ in 0..pad {
                        self.put(' ');
                    }
                }
                c if c.is_control() => {}
                c => self.put(c),
            },
            EscapeState::Escape => {
                self.escape = match c {
                    '[' => EscapeState::Csi,
                    ']' => EscapeState::Osc,
                    '(' | ')' => EscapeState::Charset,
                    _ => EscapeState::Ground,
                }
            }
            EscapeState::Charset => self.escape = EscapeState::Ground,
            EscapeState::Csi => {
                if ('\x40'..='\x7e').contains(&c) {
                    self.escape = EscapeState::Ground;
                }
            }
            EscapeState::Osc => match c {
                '\x07' => self.escape = EscapeState::Ground,
                '\x1b' => self.escape = EscapeState::OscEscape,
                _ => {}
            },
            EscapeState::OscEscape => self.escape = EscapeState::Ground,
        }
        0
    }

    fn put(&mut self, c: char) {
        if self.carriage_return {
            self.current.clear();
            self.carriage_return = false;
        }
        self.current.push(c);
    }

    fn newline(&mut self) -> usize {
        self.carriage_return = false;
        self.lines.push_back(std::mem::take(&mut self.current));
        let mut evicted = 0;
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
            evicted += 1;
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(rows: u16) -> Screen {
        Screen::new(TerminalSize::new(80, rows), 100)
    }

    #[test]
    fn test_feed_splits_lines() {
        let mut s = screen(24);
        s.feed(b"one\ntwo\nthree");
        assert_eq!(s.line_count(), 3);
        assert_eq!(s.content(), "one\ntwo\nthree");
    }

    #[test]
    fn test_crlf_and_carriage_return_overwrite() {
        let mut s = screen(24);
        s.feed(b"first\r\nprogress 10%\rprogress 99%\n");
        assert_eq!(s.content(), "first\nprogress 99%");
    }

    #[test]
    fn test_strips_escape_sequences() {
        let mut s = screen(24);
        s.feed(b"\x1b[1;32mgreen\x1b[0m \x1b]0;title\x07done\x1b(B\n");
        assert_eq!(s.content(), "green done");
    }

    #[test]
    fn test_osc_terminated_by_st() {
        let mut s = screen(24);
        s.feed(b"\x1b]8;;http://x\x1b\\link\n");
        assert_eq!(s.content(), "link");
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut s = screen(24);
        let bytes = "héllo\n".as_bytes();
        s.feed(&bytes[..2]);
        s.feed(&bytes[2..]);
        assert_eq!(s.content(), "héllo");
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut s = screen(24);
        s.feed(b"a\xffb\n");
        assert_eq!(s.content(), "a\u{fffd}b");
    }

    #[test]
    fn test_tab_and_backspace() {
        let mut s = screen(24);
        s.feed(b"ab\tc\n");
        s.feed(b"xy\x08z\n");
        assert_eq!(s.content(), "ab      c\nxz");
    }

    #[test]
    fn test_scrollback_is_bounded() {
        let mut s = Screen::new(TerminalSize::new(80, 2), 3);
        s.feed(b"1\n2\n3\n4\n5\n");
        assert_eq!(s.line_count(), 3);
        assert_eq!(s.content(), "3\n4\n5");
    }

    #[test]
    fn test_not_scrollable_when_output_fits() {
        let mut s = screen(5);
        s.feed(b"a\nb\n");
        assert!(!s.scrollable());

        s.scroll_up(10);
        assert!(!s.is_scrolling());
        assert_eq!(s.visible_lines(), vec!["a", "b"]);
    }

    #[test]
    fn test_scroll_moves_viewport() {
        let mut s = screen(2);
        s.feed(b"1\n2\n3\n4\n5\n");
        assert!(s.scrollable());
        assert_eq!(s.visible_lines(), vec!["4", "5"]);

        s.scroll_up(2);
        assert!(s.is_scrolling());
        assert_eq!(s.visible_lines(), vec!["2", "3"]);

        // Clamped to the oldest line
        s.scroll_up(100);
        assert_eq!(s.scroll_offset(), 3);
        assert_eq!(s.visible_lines(), vec!["1", "2"]);

        s.scroll_reset();
        assert!(!s.is_scrolling());
        assert_eq!(s.visible_lines(), vec!["4", "5"]);
    }

    #[test]
    fn test_scrolled_viewport_stays_anchored() {
        let mut s = screen(2);
        s.feed(b"1\n2\n3\n4\n");
        s.scroll_up(1);
        assert_eq!(s.visible_lines(), vec!["2", "3"]);

        s.feed(b"5\n6\n");
        assert_eq!(s.visible_lines(), vec!["2", "3"]);
    }

    #[test]
    fn test_partial_line_keeps_viewport_anchored() {
        let mut s = screen(2);
        s.feed(b"1\n2\n3\n4\n");
        s.scroll_up(1);
        assert_eq!(s.visible_lines(), vec!["2", "3"]);

        s.feed(b"5");
        assert_eq!(s.visible_lines(), vec!["2", "3"]);

        s.feed(b"\n");
        assert_eq!(s.visible_lines(), vec!["2", "3"]);

        s.scroll_reset();
        assert_eq!(s.visible_lines(), vec!["4", "5"]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut s = screen(2);
        s.feed(b"1\n2\n3\n4\n\x1b[");
        s.scroll_up(1);
        s.clear();

        assert_eq!(s.line_count(), 0);
        assert!(!s.is_scrolling());
        assert!(!s.scrollable());

        // Escape state was reset too, so this is printed verbatim
        s.feed(b"31mred\n");
        assert_eq!(s.content(), "31mred");
    }

    #[test]
    fn test_resize_clamps_offset() {
        let mut s = screen(2);
        s.feed(b"1\n2\n3\n4\n5\n");
        s.scroll_up(3);

        s.resize(TerminalSize::new(80, 4));
        assert_eq!(s.scroll_offset(), 1);

        s.resize(TerminalSize::new(80, 10));
        assert!(!s.is_scrolling());
    }
}
