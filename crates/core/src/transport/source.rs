use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::error::Result;

/// Default number of bytes requested per read from an [`AsyncRead`].
pub const DEFAULT_READ_SIZE: usize = 16 * 1024;

/// A producer of byte chunks, consumed by [`MjpegReader`](crate::mjpeg::MjpegReader).
///
/// Chunk boundaries carry no meaning: the parser copes with any split.
/// Dropping the source releases the underlying connection.
pub trait ChunkSource: Send {
    /// Wait for the next chunk. `Ok(None)` signals end of stream.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// Chunk source over any async byte reader (a TCP stream, a file, ...).
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_read_size(reader, DEFAULT_READ_SIZE)
    }

    pub fn with_read_size(reader: R, read_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; read_size.max(1)],
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncRead + Unpin + Send> ChunkSource for ReadSource<R> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let n = self.reader.read(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }
}

/// Chunk source fed from another task through a bounded channel.
///
/// The stream ends once every [`mpsc::Sender`] has been dropped.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/source pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

impl ChunkSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }
}
