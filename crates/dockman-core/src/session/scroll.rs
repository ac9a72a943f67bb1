//! Scroll position over a session buffer

/// Top-of-view offset into a buffer plus the visible height.
///
/// New content only drags the view down when it was already showing the
/// newest line, so scrolling back to read older output is not interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    offset: usize,
    height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: 0,
            height: 1,
        }
    }
}

impl Viewport {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Called by the renderer with the area it has
    pub fn set_height(&mut self, height: usize, total: usize) {
        let was_at_bottom = self.is_at_bottom(total);
        self.height = height.max(1);
        if was_at_bottom {
            self.scroll_to_bottom(total);
        } else {
            self.offset = self.offset.min(self.max_offset(total));
        }
    }

    fn max_offset(&self, total: usize) -> usize {
        total.saturating_sub(self.height)
    }

    pub fn is_at_bottom(&self, total: usize) -> bool {
        self.offset >= self.max_offset(total)
    }

    /// Adjust after lines were appended. `was_at_bottom` must be sampled
    /// before the append; `evicted` lines dropped off the top meanwhile.
    pub fn after_append(&mut self, was_at_bottom: bool, total: usize, evicted: usize) {
        if was_at_bottom {
            self.scroll_to_bottom(total);
        } else {
            self.offset = self.offset.saturating_sub(evicted).min(self.max_offset(total));
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize, total: usize) {
        self.offset = (self.offset + lines).min(self.max_offset(total));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height.saturating_sub(1).max(1));
    }

    pub fn page_down(&mut self, total: usize) {
        self.scroll_down(self.height.saturating_sub(1).max(1), total);
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self, total: usize) {
        self.offset = self.max_offset(total);
    }

    /// Bring `line` into view, centring it when it was off screen
    pub fn reveal(&mut self, line: usize, total: usize) {
        if line >= self.offset && line < self.offset + self.height {
            return;
        }
        self.offset = line
            .saturating_sub(self.height / 2)
            .min(self.max_offset(total));
    }

    /// Range of buffer indices currently visible
    pub fn visible(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(total);
        start..(start + self.height).min(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(height: usize, total: usize) -> Viewport {
        let mut v = Viewport::default();
        v.scroll_to_bottom(total);
        v.set_height(height, total);
        v
    }

    #[test]
    fn test_follows_when_at_bottom() {
        let mut v = viewport(10, 50);
        assert!(v.is_at_bottom(50));

        let was_at_bottom = v.is_at_bottom(50);
        v.after_append(was_at_bottom, 55, 0);
        assert_eq!(v.offset(), 45);
        assert_eq!(v.visible(55), 45..55);
    }

    #[test]
    fn test_keeps_position_when_scrolled_back() {
        let mut v = viewport(10, 50);
        v.scroll_up(20);
        assert_eq!(v.offset(), 20);

        let was_at_bottom = v.is_at_bottom(50);
        v.after_append(was_at_bottom, 60, 0);
        assert_eq!(v.offset(), 20);
        assert!(!v.is_at_bottom(60));
    }

    #[test]
    fn test_eviction_shifts_offset() {
        let mut v = viewport(10, 100);
        v.scroll_to_top();
        v.scroll_down(30, 100);
        v.after_append(false, 100, 5);
        assert_eq!(v.offset(), 25);
    }

    #[test]
    fn test_reveal_centres_line() {
        let mut v = viewport(10, 100);
        v.reveal(20, 100);
        assert_eq!(v.offset(), 15);
        v.reveal(17, 100);
        assert_eq!(v.offset(), 15);
        v.reveal(99, 100);
        assert_eq!(v.offset(), 90);
    }

    #[test]
    fn test_short_content() {
        let v = viewport(10, 3);
        assert_eq!(v.offset(), 0);
        assert!(v.is_at_bottom(3));
        assert_eq!(v.visible(3), 0..3);
    }
}
