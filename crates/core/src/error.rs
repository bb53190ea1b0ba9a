//! Error types for the camstream library.

/// Errors that can occur while consuming a camera stream.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Parser**: [`CapacityExceeded`](Self::CapacityExceeded): a single
///   multipart entity does not fit in the frame buffer. Fatal for the session.
/// - **Stream setup**: [`UnexpectedContentType`](Self::UnexpectedContentType),
///   [`MissingBoundary`](Self::MissingBoundary).
/// - **Transport**: [`Io`](Self::Io), [`InvalidUrl`](Self::InvalidUrl),
///   [`Request`](Self::Request), [`HttpStatus`](Self::HttpStatus),
///   [`BodyTooLarge`](Self::BodyTooLarge).
/// - **Playback**: [`UnknownStream`](Self::UnknownStream),
///   [`NoPlayableSource`](Self::NoPlayableSource).
/// - **Signaling**: [`Json`](Self::Json), [`Signaling`](Self::Signaling).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The frame buffer is full and still holds no complete entity.
    #[error("picture size exceeded (buffer capacity {capacity} bytes)")]
    CapacityExceeded { capacity: usize },

    /// The response is not `multipart/x-mixed-replace`.
    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// The multipart content type carries no `boundary=` parameter.
    #[error("missing multipart boundary")]
    MissingBoundary,

    /// The URL is not a valid absolute URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP request failed (connection, TLS, redirect, body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server responded with HTTP {code} {reason}")]
    HttpStatus { code: u16, reason: String },

    /// A catalog or snapshot body is larger than the accepted limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// No stream with the given name exists in the camera's catalog.
    #[error("unknown stream \"{0}\"")]
    UnknownStream(String),

    /// The stream exists but offers neither an MP4 nor an MJPEG URL.
    #[error("stream \"{0}\" has no playable URL")]
    NoPlayableSource(String),

    /// Malformed JSON in a catalog or signaling message.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer connection rejected a description or candidate.
    #[error("signaling error: {0}")]
    Signaling(String),
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
