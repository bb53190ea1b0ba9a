//! Byte transport for stream consumption.
//!
//! - **Sources** ([`source`]): the [`ChunkSource`] abstraction the MJPEG
//!   reader pulls from, with implementations over any `AsyncRead`
//!   ([`ReadSource`]) and over a channel fed by another task
//!   ([`ChannelSource`]).
//!
//! - **HTTP** ([`http`]): `GET` requests through `reqwest`. Streams keep the
//!   response open for the life of the session and pull its body chunk by
//!   chunk ([`HttpSource`]); catalog and snapshot requests read a bounded
//!   body and close.

pub mod http;
pub mod source;

pub use http::HttpSource;
pub use source::{ChannelSource, ChunkSource, ReadSource};
