//! Signaling frame wire format.
//!
//! Every WebSocket text message is `{ "event": <kind>, "data": <payload> }`.
//! Payloads are checked against the WebRTC shapes for diagnostics only; a
//! relayed frame is always forwarded exactly as received.

use crate::errors::SignalingError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A client-originated signaling message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Recognised frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Offer,
    Answer,
    Candidate,
    Hangup,
    Unknown,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Offer => "offer",
            FrameKind::Answer => "answer",
            FrameKind::Candidate => "candidate",
            FrameKind::Hangup => "hangup",
            FrameKind::Unknown => "unknown",
        }
    }

    /// Frames of this kind are forwarded to the peer.
    pub fn is_relayed(&self) -> bool {
        matches!(self, FrameKind::Offer | FrameKind::Answer | FrameKind::Candidate)
    }
}

/// `data` of an `offer` or `answer` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

/// `data` of a `candidate` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

impl SignalingFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Decode a text message.
    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text)
            .map_err(|e| SignalingError::BadRequest(format!("malformed signaling frame: {e}")))
    }

    pub fn kind(&self) -> FrameKind {
        match self.event.as_str() {
            "offer" => FrameKind::Offer,
            "answer" => FrameKind::Answer,
            "candidate" => FrameKind::Candidate,
            "hangup" => FrameKind::Hangup,
            _ => FrameKind::Unknown,
        }
    }

    /// Check the payload against its kind's shape.
    ///
    /// `hangup` and unknown kinds carry no checked payload.
    pub fn validate(&self) -> Result<(), SignalingError> {
        match self.kind() {
            kind @ (FrameKind::Offer | FrameKind::Answer) => {
                let description = SessionDescription::deserialize(&self.data).map_err(|e| {
                    SignalingError::BadRequest(format!("invalid {} payload: {e}", kind.as_str()))
                })?;
                if description.sdp_type != kind.as_str() {
                    return Err(SignalingError::BadRequest(format!(
                        "{} frame carries description of type '{}'",
                        kind.as_str(),
                        description.sdp_type
                    )));
                }
                Ok(())
            }
            FrameKind::Candidate => IceCandidate::deserialize(&self.data)
                .map(|_| ())
                .map_err(|e| SignalingError::BadRequest(format!("invalid candidate payload: {e}"))),
            FrameKind::Hangup | FrameKind::Unknown => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_offer() {
        let frame =
            SignalingFrame::parse(r#"{"event":"offer","data":{"type":"offer","sdp":"v=0"}}"#)
                .unwrap();
        assert_eq!(frame.kind(), FrameKind::Offer);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            SignalingFrame::parse("not json"),
            Err(SignalingError::BadRequest(_))
        ));
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let frame = SignalingFrame::parse(r#"{"event":"hangup"}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Hangup);
        assert_eq!(frame.data, Value::Null);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(SignalingFrame::new("answer", Value::Null).kind(), FrameKind::Answer);
        assert_eq!(
            SignalingFrame::new("candidate", Value::Null).kind(),
            FrameKind::Candidate
        );
        assert_eq!(SignalingFrame::new("chat", Value::Null).kind(), FrameKind::Unknown);
        assert!(FrameKind::Candidate.is_relayed());
        assert!(!FrameKind::Hangup.is_relayed());
        assert!(!FrameKind::Unknown.is_relayed());
    }

    #[test]
    fn test_description_type_must_match_event() {
        let frame = SignalingFrame::new("answer", json!({"type": "offer", "sdp": "v=0"}));
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_offer_without_sdp_is_invalid() {
        let frame = SignalingFrame::new("offer", json!({"type": "offer"}));
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_candidate_shapes() {
        let full = SignalingFrame::new(
            "candidate",
            json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host", "sdpMid": "0", "sdpMLineIndex": 0}),
        );
        assert!(full.validate().is_ok());

        // End-of-candidates carries an empty candidate and null indices.
        let end = SignalingFrame::new(
            "candidate",
            json!({"candidate": "", "sdpMid": null, "sdpMLineIndex": null}),
        );
        assert!(end.validate().is_ok());

        let bad_index = SignalingFrame::new(
            "candidate",
            json!({"candidate": "c", "sdpMid": "0", "sdpMLineIndex": 70000}),
        );
        assert!(bad_index.validate().is_err());
    }

    #[test]
    fn test_serialization_preserves_payload() {
        let data = json!({"type": "offer", "sdp": "v=0\r\n", "extra": [1, 2]});
        let frame = SignalingFrame::new("offer", data.clone());
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["event"], "offer");
        assert_eq!(value["data"], data);
    }
}
