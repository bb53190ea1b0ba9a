//! MJPEG over HTTP (`multipart/x-mixed-replace`).
//!
//! Cameras push MJPEG as an endless multipart body (RFC 2046 §5.1) where
//! every entity replaces the previous one:
//!
//! ```text
//! HTTP/1.1 200 OK
//! Content-Type: multipart/x-mixed-replace; boundary=frame
//!
//! --frame
//! Content-Type: image/jpeg
//! Content-Length: 40213
//!
//! <40213 bytes of JPEG>
//! --frame
//! ...
//! ```
//!
//! The layers, leaves first:
//!
//! | Type | Module | Role |
//! |------|--------|------|
//! | [`ByteBuffer`] | [`buffer`] | bounded append buffer with compaction |
//! | [`EntityHeader`] | [`header`] | folded entity header fields |
//! | [`MultipartParser`] | [`parser`] | resumable entity scanner, yields [`Frame`]s |
//! | [`MjpegReader`] | [`reader`] | pulls a [`ChunkSource`](crate::transport::ChunkSource), drives the parser |
//!
//! Frames are delimited by `Content-Length`, so the picture bytes are never
//! searched for the boundary.

pub mod buffer;
pub mod content_type;
pub mod header;
pub mod parser;
pub mod reader;

pub use buffer::ByteBuffer;
pub use content_type::parse_boundary;
pub use header::EntityHeader;
pub use parser::{Frame, MultipartParser, ParserState};
pub use reader::{HttpMjpegReader, MjpegReader, ReaderConfig};
