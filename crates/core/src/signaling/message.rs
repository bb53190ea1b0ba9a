use serde::{Deserialize, Serialize};

/// Signaling message exchanged with the camera over a WebSocket.
///
/// Encoded as a JSON object tagged by `type`:
///
/// ```
/// use camstream::signaling::SignalMessage;
///
/// let msg: SignalMessage = serde_json::from_str(r#"{"type":"offer","sdp":"v=0"}"#).unwrap();
/// assert_eq!(msg, SignalMessage::Offer { sdp: "v=0".to_string() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalMessage {
    /// First message of a session, sent by the player.
    Hello { stun_servers: Vec<String> },
    Offer { sdp: String },
    Answer { sdp: String },
    /// ICE candidate; `None` marks the end of candidates.
    Candidate {
        #[serde(default)]
        candidate: Option<CandidatePayload>,
    },
    /// Any message type this side does not handle.
    #[serde(other)]
    Unknown,
}

impl SignalMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Unknown => "unknown",
        }
    }

    pub fn candidate(candidate: Option<IceCandidate>) -> Self {
        Self::Candidate {
            candidate: candidate.map(CandidatePayload::from),
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Wire form of an ICE candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePayload {
    pub candidate: String,
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// ICE candidate as the peer connection sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub username_fragment: Option<String>,
}

impl From<CandidatePayload> for IceCandidate {
    fn from(payload: CandidatePayload) -> Self {
        Self {
            candidate: payload.candidate,
            sdp_mid: payload.mid,
            username_fragment: payload.username_fragment,
        }
    }
}

impl From<IceCandidate> for CandidatePayload {
    fn from(candidate: IceCandidate) -> Self {
        Self {
            candidate: candidate.candidate,
            mid: candidate.sdp_mid,
            username_fragment: candidate.username_fragment,
        }
    }
}
