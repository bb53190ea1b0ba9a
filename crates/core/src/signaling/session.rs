use super::message::{IceCandidate, SignalMessage};
use crate::error::Result;

/// The WebRTC peer connection driven by a [`SignalingSession`].
///
/// Implementations wrap whatever WebRTC stack the player uses. Errors are
/// reported back as [`StreamError::Signaling`](crate::StreamError::Signaling)
/// or any other [`StreamError`](crate::StreamError).
pub trait PeerConnection {
    fn set_remote_offer(&mut self, sdp: &str) -> Result<()>;

    /// Create the SDP answer to the remote offer.
    fn create_answer(&mut self) -> Result<String>;

    fn set_local_answer(&mut self, sdp: &str) -> Result<()>;

    /// Add a remote candidate; `None` is end-of-candidates.
    fn add_ice_candidate(&mut self, candidate: Option<&IceCandidate>) -> Result<()>;

    fn close(&mut self);
}

/// Answering side of the camera's WebRTC signaling.
///
/// The session does no I/O: feed it incoming messages and send whatever it
/// returns. Remote candidates are held back until the offer has been
/// applied, local candidates until the answer has been sent.
pub struct SignalingSession<P> {
    peer: P,
    stun_servers: Vec<String>,
    buffer_local: bool,
    local_candidates: Vec<Option<IceCandidate>>,
    buffer_remote: bool,
    remote_candidates: Vec<Option<IceCandidate>>,
}

impl<P: PeerConnection> SignalingSession<P> {
    pub fn new(peer: P, stun_servers: Vec<String>) -> Self {
        Self {
            peer,
            stun_servers,
            buffer_local: true,
            local_candidates: Vec::new(),
            buffer_remote: true,
            remote_candidates: Vec::new(),
        }
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// ICE server URLs for configuring the peer connection.
    pub fn ice_servers(&self) -> Vec<String> {
        self.stun_servers
            .iter()
            .map(|server| format!("stun:{}", server))
            .collect()
    }

    /// Message that opens the session.
    pub fn hello(&self) -> SignalMessage {
        SignalMessage::Hello {
            stun_servers: self.stun_servers.clone(),
        }
    }

    /// Decode and handle one text frame from the signaling socket.
    pub fn handle_text(&mut self, text: &str) -> Result<Vec<SignalMessage>> {
        let msg: SignalMessage = serde_json::from_str(text)?;
        Ok(self.handle_message(msg))
    }

    /// Handle an incoming message and return the messages to send back.
    pub fn handle_message(&mut self, msg: SignalMessage) -> Vec<SignalMessage> {
        tracing::debug!(kind = msg.kind(), "signaling message received");

        match msg {
            SignalMessage::Offer { sdp } => self.handle_offer(&sdp),
            SignalMessage::Candidate { candidate } => {
                self.remote_candidate(candidate.map(IceCandidate::from));
                Vec::new()
            }
            other => {
                tracing::warn!(kind = other.kind(), "unexpected signaling message");
                Vec::new()
            }
        }
    }

    /// A candidate gathered by the local peer. Returns the message to send,
    /// or `None` while the answer is still pending.
    pub fn on_local_candidate(&mut self, candidate: Option<IceCandidate>) -> Option<SignalMessage> {
        if self.buffer_local {
            self.local_candidates.push(candidate);
            None
        } else {
            Some(SignalMessage::candidate(candidate))
        }
    }

    /// Close the peer and forget all pending candidates.
    pub fn terminate(&mut self) {
        self.peer.close();

        self.buffer_local = true;
        self.local_candidates.clear();
        self.buffer_remote = true;
        self.remote_candidates.clear();

        tracing::debug!("signaling session terminated");
    }

    fn handle_offer(&mut self, sdp: &str) -> Vec<SignalMessage> {
        let mut out = Vec::new();

        if let Err(err) = self.peer.set_remote_offer(sdp) {
            tracing::error!(error = %err, "unable to apply offer");
            return out;
        }

        self.buffer_remote = false;
        for candidate in std::mem::take(&mut self.remote_candidates) {
            self.remote_candidate(candidate);
        }

        let answer = match self.peer.create_answer() {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "unable to create answer");
                return out;
            }
        };

        out.push(SignalMessage::Answer {
            sdp: answer.clone(),
        });

        self.buffer_local = false;
        out.extend(
            std::mem::take(&mut self.local_candidates)
                .into_iter()
                .map(SignalMessage::candidate),
        );

        if let Err(err) = self.peer.set_local_answer(&answer) {
            tracing::error!(error = %err, "unable to apply answer");
        }

        out
    }

    fn remote_candidate(&mut self, candidate: Option<IceCandidate>) {
        if self.buffer_remote {
            self.remote_candidates.push(candidate);
        } else if let Err(err) = self.peer.add_ice_candidate(candidate.as_ref()) {
            tracing::warn!(error = %err, "unable to add remote candidate");
        }
    }
}
