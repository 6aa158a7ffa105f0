//! Output window for DEFLATE decompression.
//!
//! Decoded bytes land here first. The window serves two purposes at once:
//! it is the history that back-references copy from, and it is the staging
//! area for bytes the caller has not collected yet. Bytes still waiting to be
//! drained are never overwritten, so the decoder must check
//! [`free`](InflateWindow::free) before producing more.

use crate::error::{OxiflateError, Result};

/// Default window size for DEFLATE (32 KB).
pub const DEFLATE_WINDOW: usize = 32768;

/// Circular history plus undrained output.
#[derive(Debug, Clone)]
pub struct InflateWindow {
    buffer: Vec<u8>,
    /// Next write index.
    position: usize,
    /// Bytes of valid history, capped at capacity.
    filled: usize,
    /// Bytes written but not yet drained.
    pending: usize,
    mask: usize,
}

impl InflateWindow {
    /// Create a window with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of 2.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Capacity must be a power of 2, got {}",
            capacity
        );

        Self {
            buffer: vec![0; capacity],
            position: 0,
            filled: 0,
            pending: 0,
            mask: capacity - 1,
        }
    }

    /// Window size in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes of history available to back-references.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Whether no byte has been written yet.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Bytes waiting to be drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Bytes that can be produced before a drain is required.
    pub fn free(&self) -> usize {
        self.buffer.len() - self.pending
    }

    /// Forget all history and pending output.
    pub fn clear(&mut self) {
        self.position = 0;
        self.filled = 0;
        self.pending = 0;
    }

    /// Append one decoded byte.
    #[inline(always)]
    pub fn push(&mut self, byte: u8) {
        debug_assert!(self.pending < self.buffer.len());
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        self.pending += 1;
        if self.filled < self.buffer.len() {
            self.filled += 1;
        }
    }

    /// Append decoded bytes. `bytes.len()` must not exceed [`free`](Self::free).
    pub fn push_slice(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.free());
        let mut rest = bytes;
        while !rest.is_empty() {
            let run = rest.len().min(self.buffer.len() - self.position);
            self.buffer[self.position..self.position + run].copy_from_slice(&rest[..run]);
            self.position = (self.position + run) & self.mask;
            rest = &rest[run..];
        }
        self.pending += bytes.len();
        self.filled = (self.filled + bytes.len()).min(self.buffer.len());
    }

    /// Copy `length` bytes starting `distance` bytes back.
    ///
    /// Overlapping copies (length > distance) repeat the pattern, as LZ77
    /// requires. `length` must not exceed [`free`](Self::free).
    pub fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        if distance == 0 || distance > self.filled {
            return Err(OxiflateError::invalid_distance(distance, self.filled));
        }
        debug_assert!(length <= self.free());

        let mut src = (self.position.wrapping_sub(distance)) & self.mask;
        if distance >= length
            && src + length <= self.buffer.len()
            && self.position + length <= self.buffer.len()
        {
            self.buffer
                .copy_within(src..src + length, self.position);
            self.position = (self.position + length) & self.mask;
            self.pending += length;
            self.filled = (self.filled + length).min(self.buffer.len());
            return Ok(());
        }

        for _ in 0..length {
            let byte = self.buffer[src];
            self.push(byte);
            src = (src + 1) & self.mask;
        }
        Ok(())
    }

    /// Move pending bytes, oldest first, into `out`. Returns the count.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let count = self.pending.min(out.len());
        let mut start = (self.position.wrapping_sub(self.pending)) & self.mask;
        let mut copied = 0;
        while copied < count {
            let run = (count - copied).min(self.buffer.len() - start);
            out[copied..copied + run].copy_from_slice(&self.buffer[start..start + run]);
            copied += run;
            start = (start + run) & self.mask;
        }
        self.pending -= count;
        count
    }

    /// Seed the history with a preset dictionary.
    ///
    /// Dictionary bytes are history only; they are never drained. A
    /// dictionary longer than the window contributes its last `capacity`
    /// bytes.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        let tail = &dictionary[dictionary.len().saturating_sub(self.buffer.len())..];
        let pending = self.pending;
        self.push_slice(tail);
        self.pending = pending;
    }

    /// The last `count` history bytes, oldest first.
    pub fn last_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.filled);
        (0..count)
            .map(|i| self.buffer[(self.position.wrapping_sub(count - i)) & self.mask])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_basic() {
        let mut window = InflateWindow::new(8);
        window.push_slice(b"Hello");

        assert_eq!(window.len(), 5);
        assert_eq!(window.pending(), 5);
        assert_eq!(window.free(), 3);

        let mut out = [0u8; 8];
        assert_eq!(window.drain_into(&mut out), 5);
        assert_eq!(&out[..5], b"Hello");
        assert_eq!(window.pending(), 0);
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_window_wrap() {
        let mut window = InflateWindow::new(4);
        let mut out = [0u8; 4];

        window.push_slice(b"ABC");
        window.drain_into(&mut out);
        window.push_slice(b"DEF"); // wraps around

        assert_eq!(window.len(), 4);
        assert_eq!(window.drain_into(&mut out), 3);
        assert_eq!(&out[..3], b"DEF");
        assert_eq!(window.last_bytes(4), b"CDEF");
    }

    #[test]
    fn test_copy_match() {
        let mut window = InflateWindow::new(32);
        window.push_slice(b"ABCD");
        window.copy_match(4, 4).unwrap();

        let mut out = [0u8; 16];
        let n = window.drain_into(&mut out);
        assert_eq!(&out[..n], b"ABCDABCD");
    }

    #[test]
    fn test_copy_overlap() {
        // length > distance repeats the pattern
        let mut window = InflateWindow::new(32);
        window.push_slice(b"AB");
        window.copy_match(2, 6).unwrap();
        assert_eq!(window.last_bytes(8), b"ABABABAB");

        window.push(b'X');
        window.copy_match(1, 5).unwrap();
        assert_eq!(window.last_bytes(6), b"XXXXXX");
    }

    #[test]
    fn test_copy_across_wrap() {
        let mut window = InflateWindow::new(8);
        let mut out = [0u8; 8];
        window.push_slice(b"abcdef");
        window.drain_into(&mut out);
        window.copy_match(6, 5).unwrap();
        assert_eq!(window.drain_into(&mut out), 5);
        assert_eq!(&out[..5], b"abcde");
    }

    #[test]
    fn test_invalid_distance() {
        let mut window = InflateWindow::new(32);
        assert!(window.copy_match(1, 1).is_err());
        window.push(b'a');
        assert!(window.copy_match(0, 1).is_err());
        assert!(window.copy_match(2, 1).is_err());
    }

    #[test]
    fn test_partial_drain() {
        let mut window = InflateWindow::new(16);
        window.push_slice(b"0123456789");
        let mut out = [0u8; 4];
        assert_eq!(window.drain_into(&mut out), 4);
        assert_eq!(&out, b"0123");
        assert_eq!(window.drain_into(&mut out), 4);
        assert_eq!(&out, b"4567");
        assert_eq!(window.pending(), 2);
    }

    #[test]
    fn test_preload_dictionary() {
        let mut window = InflateWindow::new(8);
        window.preload_dictionary(b"0123456789");

        assert_eq!(window.pending(), 0);
        assert_eq!(window.len(), 8);
        assert_eq!(window.last_bytes(8), b"23456789");

        window.copy_match(3, 3).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(window.drain_into(&mut out), 3);
        assert_eq!(&out[..3], b"789");
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn test_non_power_of_two_panics() {
        let _ = InflateWindow::new(100);
    }
}
