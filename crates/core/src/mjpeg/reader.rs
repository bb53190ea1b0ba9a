use tokio_util::sync::CancellationToken;

use super::buffer::DEFAULT_CAPACITY;
use super::content_type::{MIXED_REPLACE, parse_boundary};
use super::parser::{Frame, MultipartParser};
use crate::error::{Result, StreamError};
use crate::transport::http::{self, HttpSource};
use crate::transport::source::ChunkSource;

/// Per-session reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Largest entity (headers + picture) the session can hold.
    pub capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// MJPEG reader over an HTTP response body.
pub type HttpMjpegReader = MjpegReader<HttpSource>;

/// Pulls chunks from a [`ChunkSource`] and yields decoded frames.
///
/// One reader per stream session; [`read_frame`](Self::read_frame) must not
/// be called concurrently (it takes `&mut self`). Cancellation is
/// cooperative: [`cancel`](Self::cancel) or a clone of
/// [`cancellation_token`](Self::cancellation_token) ends the session, and a
/// read suspended on the source resolves to end-of-stream.
pub struct MjpegReader<S> {
    parser: MultipartParser,
    source: Option<S>,
    /// Part of the last chunk that did not fit into the parser buffer.
    unused_chunk: Option<Vec<u8>>,
    cancel: CancellationToken,
    frames: u64,
}

impl<S: ChunkSource> MjpegReader<S> {
    /// Fails with [`StreamError::CapacityExceeded`] when the capacity cannot
    /// even hold the entity delimiter.
    pub fn new(boundary: &str, source: S, config: &ReaderConfig) -> Result<Self> {
        let mut parser = MultipartParser::with_capacity(boundary, config.capacity);

        if config.capacity < parser.entity_prefix_len() {
            return Err(StreamError::CapacityExceeded {
                capacity: config.capacity,
            });
        }

        // The first delimiter of a body may come without the CRLF that
        // precedes every other one (RFC 2046 §5.1.1).
        parser.push(b"\r\n")?;

        Ok(Self {
            parser,
            source: Some(source),
            unused_chunk: None,
            cancel: CancellationToken::new(),
            frames: 0,
        })
    }

    /// Create a reader from the response `Content-Type`, which must be
    /// `multipart/x-mixed-replace` with a boundary parameter.
    pub fn from_content_type(content_type: &str, source: S, config: &ReaderConfig) -> Result<Self> {
        let boundary = parse_boundary(content_type)?;
        tracing::debug!(%boundary, "multipart boundary");
        Self::new(&boundary, source, config)
    }

    pub fn boundary(&self) -> &str {
        self.parser.boundary()
    }

    /// Number of frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this session from another task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the session and release the source.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.source.take().is_some() {
            tracing::info!(frames = self.frames, "stream cancelled");
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` once the source is exhausted or the session was
    /// cancelled. Fails with [`StreamError::CapacityExceeded`] when an entity
    /// does not fit into the buffer; the session cannot continue after that.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.parser.take() {
                self.frames += 1;
                return Ok(Some(frame));
            }

            let Some(mut chunk) = self.read_chunk().await? else {
                return Ok(None);
            };

            let remaining = self.parser.push(&chunk)?.len();
            if remaining > 0 {
                chunk.drain(..chunk.len() - remaining);
                self.unused_chunk = Some(chunk);
            }
        }
    }

    /// Next non-empty chunk: leftover data first, then the source.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.unused_chunk.take() {
            return Ok(Some(chunk));
        }

        loop {
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };

            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                chunk = source.next_chunk() => chunk?,
            };

            match chunk {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => return Ok(Some(chunk)),
                None => {
                    // never poll a finished or cancelled source again
                    self.source = None;
                    if self.cancel.is_cancelled() {
                        tracing::info!(frames = self.frames, "stream cancelled");
                    } else {
                        tracing::debug!(frames = self.frames, "end of stream");
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl HttpMjpegReader {
    /// Open an MJPEG stream at `url`.
    ///
    /// Fails if the server does not answer 2xx with a
    /// `multipart/x-mixed-replace` body.
    pub async fn fetch(url: &str, config: &ReaderConfig) -> Result<Self> {
        let response = http::send_get(url, MIXED_REPLACE, None).await?;

        let content_type = http::content_type(&response)
            .ok_or_else(|| StreamError::UnexpectedContentType(String::new()))?
            .to_string();

        let reader = Self::from_content_type(&content_type, HttpSource::new(response), config)?;

        tracing::info!(url, boundary = %reader.boundary(), "MJPEG stream opened");
        Ok(reader)
    }
}
