use crate::error::{Result, StreamError};

/// Default buffer capacity: the largest entity (headers + picture) a stream
/// may send.
pub const DEFAULT_CAPACITY: usize = 10_000_000;

/// Fixed-capacity append buffer with front compaction.
///
/// Valid bytes always live at `[0, len)`. [`append`](Self::append) grows the
/// valid region up to [`capacity`](Self::capacity), and
/// [`consume`](Self::consume) drops bytes from the front, shifting the rest
/// down to offset 0.
///
/// Memory is allocated as data arrives rather than up front, so an idle
/// session does not pin the full capacity.
#[derive(Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    /// Append as much of `chunk` as fits and return the suffix that did not.
    ///
    /// Fails with [`StreamError::CapacityExceeded`] when the buffer is
    /// already full: the caller has a single entity larger than the buffer.
    pub fn append<'a>(&mut self, chunk: &'a [u8]) -> Result<&'a [u8]> {
        let available = self.capacity - self.data.len();

        if available == 0 {
            return Err(StreamError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let used = available.min(chunk.len());
        self.data.extend_from_slice(&chunk[..used]);

        Ok(&chunk[used..])
    }

    /// Drop the first `n` bytes. `n` is clamped to the number of valid bytes.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.data.len());
        if n > 0 {
            self.data.drain(..n);
        }
    }

    /// Lowest offset `>= from` at which `needle` occurs in the valid bytes.
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        let haystack = self.data.get(from..)?;

        if needle.is_empty() {
            return Some(from);
        }

        haystack
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| from + pos)
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The valid bytes `[0, len)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
