//! WebRTC signaling with the camera.
//!
//! The camera offers, the player answers. After the player's `hello`, the
//! exchange over the signaling WebSocket looks like this:
//!
//! ```text
//! player                         camera
//!   | -- hello {stun_servers} -->   |
//!   | <-- offer {sdp} ------------- |
//!   | <-- candidate ... ----------- |
//!   | -- answer {sdp} ------------> |
//!   | -- candidate ... -----------> |
//!   | <-- candidate null ---------- |   end of candidates
//! ```
//!
//! Candidates that arrive before the offer has been applied are held back,
//! and so are local candidates gathered before the answer was sent.
//! [`SignalingSession`] implements that ordering on top of any
//! [`PeerConnection`]; the WebSocket and the WebRTC stack stay outside.

pub mod message;
pub mod session;

pub use message::{CandidatePayload, IceCandidate, SignalMessage};
pub use session::{PeerConnection, SignalingSession};
