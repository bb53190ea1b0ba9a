use super::buffer::{ByteBuffer, DEFAULT_CAPACITY};
use super::header::EntityHeader;
use crate::error::Result;

const CRLF: &[u8] = b"\r\n";
const EMPTY_LINE: &[u8] = b"\r\n\r\n";

/// One decoded picture from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Value of the entity's `Content-Type` field (empty when absent).
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Scan cursor over the current entity.
///
/// Every position is resolved at most once per entity and stays cached until
/// the parser consumes bytes from the buffer, which clears all of them.
/// `None` means "not found yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    /// Offset of `CRLF "--" boundary`.
    pub entity_start: Option<usize>,
    /// Offset just past the boundary line.
    pub header_start: Option<usize>,
    /// Offset of the `CRLF CRLF` that terminates the header block.
    pub header_end: Option<usize>,
    /// Declared body size of the current entity.
    pub frame_size: Option<usize>,
    /// Decoded header block of the current entity.
    pub header: Option<EntityHeader>,
}

/// Incremental parser for `multipart/x-mixed-replace` bodies (RFC 2046).
///
/// Bytes are fed with [`push`](Self::push) in whatever pieces the network
/// delivers, and complete frames are pulled with [`take`](Self::take).
/// An entity is laid out as:
///
/// ```text
/// CRLF "--" boundary CRLF
/// Content-Type: image/jpeg CRLF
/// Content-Length: 1234 CRLF
/// CRLF
/// <1234 body bytes>
/// ```
///
/// Only entities with a valid `Content-Length` yield frames; the body is
/// delimited by that length, not by the next boundary. Entities without one
/// (e.g. a preamble) are skipped.
#[derive(Debug)]
pub struct MultipartParser {
    buffer: ByteBuffer,
    boundary: String,
    entity_prefix: Vec<u8>,
    state: ParserState,
}

impl MultipartParser {
    pub fn new(boundary: &str) -> Self {
        Self::with_capacity(boundary, DEFAULT_CAPACITY)
    }

    /// Create a parser whose buffer holds at most `capacity` bytes. This
    /// bounds the size of a single entity (headers + body).
    pub fn with_capacity(boundary: &str, capacity: usize) -> Self {
        let mut entity_prefix = Vec::with_capacity(boundary.len() + 4);
        entity_prefix.extend_from_slice(CRLF);
        entity_prefix.extend_from_slice(b"--");
        entity_prefix.extend_from_slice(boundary.as_bytes());

        Self {
            buffer: ByteBuffer::with_capacity(capacity),
            boundary: boundary.to_string(),
            entity_prefix,
            state: ParserState::default(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Length of the entity delimiter `CRLF "--" boundary`.
    pub fn entity_prefix_len(&self) -> usize {
        self.entity_prefix.len()
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Feed a chunk of stream data.
    ///
    /// Returns the part of `chunk` that did not fit into the buffer; the
    /// caller must push it again after [`take`](Self::take) has freed space.
    /// Fails with [`CapacityExceeded`](crate::StreamError::CapacityExceeded)
    /// if the buffer is already full.
    pub fn push<'a>(&mut self, chunk: &'a [u8]) -> Result<&'a [u8]> {
        self.buffer.append(chunk)
    }

    /// Take the next complete frame, or `None` if more data is needed.
    pub fn take(&mut self) -> Option<Frame> {
        let frame_size = self.frame_size()?;
        let header_end = self.state.header_end?;

        let frame_start = header_end + EMPTY_LINE.len();
        let frame_end = frame_start.checked_add(frame_size)?;

        if frame_end > self.buffer.len() {
            return None;
        }

        let data = self.buffer.as_slice()[frame_start..frame_end].to_vec();
        let content_type = self
            .state
            .header
            .as_ref()
            .and_then(EntityHeader::content_type)
            .unwrap_or_default()
            .to_string();

        self.reset(frame_end);

        tracing::debug!(
            size = data.len(),
            content_type = %content_type,
            buffered = self.buffer.len(),
            "frame parsed"
        );

        Some(Frame { content_type, data })
    }

    /// Drop `n` bytes from the front of the buffer and forget the cached
    /// positions, which referred to the old layout.
    fn reset(&mut self, n: usize) {
        self.buffer.consume(n);
        self.state = ParserState::default();
    }

    /// Body size of the current entity. Entities without a usable
    /// `Content-Length` are consumed and the scan moves on to the next one.
    fn frame_size(&mut self) -> Option<usize> {
        loop {
            if let Some(size) = self.state.frame_size {
                return Some(size);
            }

            let header_end = self.header_end()?;
            let content_length = self.header()?.content_length();
            match content_length {
                Some(size) => self.state.frame_size = Some(size),
                None => {
                    tracing::trace!(header_end, "skipping entity without content-length");
                    self.reset(header_end + EMPTY_LINE.len());
                }
            }
        }
    }

    fn header(&mut self) -> Option<&EntityHeader> {
        if self.state.header.is_none() {
            let start = self.header_start()?;
            let end = self.header_end()?;

            let text = String::from_utf8_lossy(&self.buffer.as_slice()[start..end]);
            self.state.header = Some(EntityHeader::parse(&text));
        }

        self.state.header.as_ref()
    }

    fn header_end(&mut self) -> Option<usize> {
        if self.state.header_end.is_none() {
            let start = self.header_start()?;
            self.state.header_end = self.buffer.find(EMPTY_LINE, start);
        }

        self.state.header_end
    }

    /// Skips the boundary line itself, including any transport padding or
    /// the `--` close delimiter after the boundary.
    fn header_start(&mut self) -> Option<usize> {
        if self.state.header_start.is_none() {
            let entity_start = self.entity_start()?;
            self.state.header_start = self
                .buffer
                .find(CRLF, entity_start + CRLF.len())
                .map(|pos| pos + CRLF.len());
        }

        self.state.header_start
    }

    fn entity_start(&mut self) -> Option<usize> {
        if self.state.entity_start.is_none() {
            self.state.entity_start = self.buffer.find(&self.entity_prefix, 0);
        }

        if self.state.entity_start.is_none() {
            // Only the tail could still hold the beginning of a prefix split
            // across chunks; everything before it is never scanned again.
            let keep = self.entity_prefix.len() - 1;
            let drop = self.buffer.len().saturating_sub(keep);
            if drop > 0 {
                tracing::trace!(dropped = drop, "no entity prefix, discarding data");
                self.reset(drop);
            }
        }

        self.state.entity_start
    }
}
