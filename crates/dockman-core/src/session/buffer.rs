//! Bounded line buffer with FIFO eviction

use std::collections::VecDeque;

/// Default number of lines a session keeps
pub const DEFAULT_BUFFER_LINES: usize = 1000;

/// Ordered lines capped at `cap`; the oldest line goes first
#[derive(Debug, Clone)]
pub struct LineBuffer<T> {
    lines: VecDeque<T>,
    cap: usize,
    evicted: u64,
}

impl<T> LineBuffer<T> {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            lines: VecDeque::with_capacity(cap.min(DEFAULT_BUFFER_LINES)),
            cap,
            evicted: 0,
        }
    }

    /// Append a line, returning the evicted oldest line if the cap was hit
    pub fn push(&mut self, line: T) -> Option<T> {
        self.lines.push_back(line);
        self.trim()
    }

    /// Insert just before the last line (or append to an empty buffer)
    pub fn insert_before_last(&mut self, line: T) -> Option<T> {
        let at = self.lines.len().saturating_sub(1);
        self.lines.insert(at, line);
        self.trim()
    }

    fn trim(&mut self) -> Option<T> {
        if self.lines.len() > self.cap {
            self.evicted += 1;
            self.lines.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Lines evicted over the buffer's lifetime
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.lines.get(index)
    }

    pub fn front(&self) -> Option<&T> {
        self.lines.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.lines.front_mut()
    }

    pub fn back(&self) -> Option<&T> {
        self.lines.back()
    }

    pub fn pop_back(&mut self) -> Option<T> {
        self.lines.pop_back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.lines.iter()
    }

    /// Drop everything from `len` onwards
    pub fn truncate(&mut self, len: usize) {
        self.lines.truncate(len);
    }

    /// Keep only lines matching the predicate
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.lines.retain(keep);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl<T: Clone> LineBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.lines.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction_keeps_last_lines() {
        let mut buffer = LineBuffer::new(1000);
        for i in 0..1200 {
            buffer.push(format!("line {}", i));
            assert!(buffer.len() <= 1000);
        }
        let expected: Vec<String> = (200..1200).map(|i| format!("line {}", i)).collect();
        assert_eq!(buffer.to_vec(), expected);
        assert_eq!(buffer.evicted(), 200);
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut buffer = LineBuffer::new(2);
        assert_eq!(buffer.push(1), None);
        assert_eq!(buffer.push(2), None);
        assert_eq!(buffer.push(3), Some(1));
        assert_eq!(buffer.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_insert_before_last() {
        let mut buffer = LineBuffer::new(3);
        buffer.insert_before_last("prompt");
        buffer.insert_before_last("a");
        buffer.insert_before_last("b");
        assert_eq!(buffer.to_vec(), vec!["a", "b", "prompt"]);

        assert_eq!(buffer.insert_before_last("c"), Some("a"));
        assert_eq!(buffer.to_vec(), vec!["b", "c", "prompt"]);
    }
}
