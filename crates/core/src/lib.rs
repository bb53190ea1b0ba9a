pub mod error;
pub mod mjpeg;
pub mod playback;
pub mod signaling;
pub mod transport;

pub use error::{Result, StreamError};
pub use mjpeg::{Frame, HttpMjpegReader, MjpegReader, MultipartParser, ReaderConfig};
pub use playback::{PlaybackAction, PlaybackConfig, PlaybackCoordinator, PlaybackState};
pub use signaling::{PeerConnection, SignalMessage, SignalingSession};
