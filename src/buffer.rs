//! Byte Buffer
//!
//! A growable byte accumulator with separate read and write cursors.
//!
//! ```text
//!  0           read                write          capacity
//!  ├────────────┼────────────────────┼───────────────┤
//!  │  consumed  │      unread        │     spare     │
//!  └────────────┴────────────────────┴───────────────┘
//! ```
//!
//! Appends advance `write`, consumes advance `read`. Compaction drops the
//! consumed prefix so a long-lived connection does not grow without bound.
//!
//! Storage is a `BytesMut`: compaction advances past the prefix instead of
//! moving bytes, and [`Buffer::split_unread`] hands out payloads that share
//! the allocation instead of copying it.

use bytes::{Buf, Bytes, BytesMut};

/// Consumed prefix size that makes compaction worthwhile
pub const DEFAULT_COMPACT_THRESHOLD: usize = 16 * 1024;

/// A byte buffer with read/write cursors
#[derive(Debug, Clone)]
pub struct Buffer {
    /// Stored bytes; `data.len()` is the write offset
    data: BytesMut,

    /// Read offset (always <= data.len())
    read: usize,

    /// Consumed prefix size that triggers automatic compaction
    compact_threshold: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty buffer with preallocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read: 0,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }

    /// Set the consumed-prefix size that triggers automatic compaction
    pub fn set_compact_threshold(&mut self, threshold: usize) {
        self.compact_threshold = threshold;
    }

    /// Append bytes at the write cursor
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.maybe_compact();
        self.data.extend_from_slice(bytes);
    }

    /// Unread bytes (between the read and write cursors)
    pub fn unread(&self) -> &[u8] {
        &self.data[self.read..]
    }

    /// Advance the read cursor by `n` bytes
    ///
    /// `n` is clamped to the number of unread bytes.
    pub fn consume(&mut self, n: usize) {
        self.read += n.min(self.len());
        if self.read == self.data.len() {
            // Everything consumed: rewind for free
            self.data.clear();
            self.read = 0;
        }
    }

    /// Take the next `n` unread bytes without copying them
    ///
    /// `n` is clamped to the number of unread bytes. The consumed prefix is
    /// dropped along the way, so the read cursor ends at zero.
    pub fn split_unread(&mut self, n: usize) -> Bytes {
        let n = n.min(self.len());
        let mut head = self.data.split_to(self.read + n);
        head.advance(self.read);
        self.read = 0;
        head.freeze()
    }

    /// Number of unread bytes
    pub fn len(&self) -> usize {
        self.data.len() - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read cursor position
    pub fn read_offset(&self) -> usize {
        self.read
    }

    /// Write cursor position
    pub fn write_offset(&self) -> usize {
        self.data.len()
    }

    /// Allocated capacity
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Discard consumed bytes, moving unread bytes to the front
    pub fn compact(&mut self) {
        if self.read > 0 {
            self.data.advance(self.read);
            self.read = 0;
        }
    }

    /// Compact when the consumed prefix is past the threshold and at
    /// least half of the stored bytes
    pub fn maybe_compact(&mut self) {
        if self.read >= self.compact_threshold && self.read * 2 >= self.data.len() {
            self.compact();
        }
    }

    /// Drop all bytes and reset both cursors
    pub fn clear(&mut self) {
        self.data.clear();
        self.read = 0;
    }

    /// Mutable access to the tail for in-place encoding
    pub(crate) fn writer(&mut self) -> &mut BytesMut {
        self.maybe_compact();
        &mut self.data
    }
}
