/// Viewport position within a pane's scrollback.
///
/// `offset` counts lines above the live edge: 0 means the viewport follows new
/// output, anything else means the user has scrolled into history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scroll offset (0 = live edge)
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the viewport is away from the live edge
    pub fn is_scrolling(&self) -> bool {
        self.offset > 0
    }

    /// Scroll towards older output, capped at `max_scroll`
    pub fn scroll_up(&mut self, lines: usize, max_scroll: usize) {
        self.offset = self.offset.saturating_add(lines).min(max_scroll);
    }

    /// Scroll towards live output. Reaching 0 resumes following.
    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Clamp scroll offset to available scrollback length
    pub fn clamp_to_scrollback(&mut self, max_scroll: usize) {
        if self.offset > max_scroll {
            self.offset = max_scroll;
        }
    }

    /// Keep a scrolled viewport pinned to the same content while `new_lines`
    /// are appended below it. Following viewports are left alone.
    pub fn follow_output(&mut self, new_lines: usize, max_scroll: usize) {
        if self.is_scrolling() {
            self.scroll_up(new_lines, max_scroll);
        }
    }
}
