use crate::ProtocolError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Largest encoded stream message accepted by any endpoint (8 MiB).
///
/// A 640x480 JPEG at quality 80 is well under 100 KiB once base64 encoded, so
/// this leaves headroom for high resolution producers while bounding memory.
pub const MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

/// One classified object attached to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    /// Percentage in `0..=100`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(class: impl Into<String>, confidence: f64) -> Self {
        Self {
            class: class.into(),
            confidence,
        }
    }

    /// Display row, e.g. `person — 92%`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}%", self.class, self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    /// The detection producer reports a problem with its source.
    Error { message: String },
    Status { message: String },
    Frame {
        /// Base64 encoded JPEG.
        image: String,
        #[serde(default, deserialize_with = "null_as_empty")]
        detections: Vec<Detection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Detection>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Detection>>::deserialize(deserializer)?.unwrap_or_default())
}

const KNOWN_TYPES: [&str; 3] = ["error", "status", "frame"];

impl StreamMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    pub fn frame(image: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self::Frame {
            image: image.into(),
            detections,
            timestamp: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Status { .. } => "status",
            Self::Frame { .. } => "frame",
        }
    }

    /// Decode one text frame.
    ///
    /// Returns `Ok(None)` when the payload is valid JSON but its `type` is
    /// absent or not one of `error`, `status`, `frame`. Such payloads are
    /// ignored by consumers rather than treated as errors.
    pub fn decode(text: &str) -> Result<Option<Self>, ProtocolError> {
        if text.len() > MAX_MESSAGE_BYTES {
            return Err(ProtocolError::TooLarge {
                size: text.len(),
                limit: MAX_MESSAGE_BYTES,
            });
        }

        let value: serde_json::Value = serde_json::from_str(text)?;
        let known = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|kind| KNOWN_TYPES.contains(&kind));

        if !known {
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(value)?))
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_status() {
        let msg = StreamMessage::decode(r#"{"type":"status","message":"Connected"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(msg, StreamMessage::status("Connected"));
    }

    #[test]
    fn decodes_producer_frame_with_timestamp() {
        let text = r#"{"type":"frame","image":"AAEC","detections":[{"class":"person","confidence":92}],"timestamp":"2024-03-01T10:00:00"}"#;
        let msg = StreamMessage::decode(text).unwrap().unwrap();

        match msg {
            StreamMessage::Frame {
                image,
                detections,
                timestamp,
            } => {
                assert_eq!(image, "AAEC");
                assert_eq!(detections, vec![Detection::new("person", 92.0)]);
                assert_eq!(timestamp.as_deref(), Some("2024-03-01T10:00:00"));
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn absent_or_null_detections_are_empty() {
        for text in [
            r#"{"type":"frame","image":"AAEC"}"#,
            r#"{"type":"frame","image":"AAEC","detections":null}"#,
        ] {
            let msg = StreamMessage::decode(text).unwrap().unwrap();
            assert!(
                matches!(msg, StreamMessage::Frame { ref detections, .. } if detections.is_empty()),
                "{text} should decode with no detections"
            );
        }
    }

    #[test]
    fn unknown_or_missing_type_is_ignored() {
        assert!(StreamMessage::decode(r#"{"type":"ping"}"#).unwrap().is_none());
        assert!(StreamMessage::decode(r#"{"message":"hi"}"#).unwrap().is_none());
        assert!(StreamMessage::decode(r#"{"type":7}"#).unwrap().is_none());
        assert!(StreamMessage::decode("[1,2,3]").unwrap().is_none());
    }

    #[test]
    fn non_json_is_malformed() {
        let err = StreamMessage::decode("hello camera").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn known_type_with_missing_fields_is_malformed() {
        assert!(matches!(
            StreamMessage::decode(r#"{"type":"error"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            StreamMessage::decode(r#"{"type":"frame","detections":[]}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected_before_parsing() {
        let text = "x".repeat(MAX_MESSAGE_BYTES + 1);
        assert!(matches!(
            StreamMessage::decode(&text),
            Err(ProtocolError::TooLarge { .. })
        ));
    }

    #[test]
    fn encode_uses_type_tag() {
        let text = StreamMessage::error("Cannot access camera").encode().unwrap();
        assert_eq!(text, r#"{"type":"error","message":"Cannot access camera"}"#);

        let frame = StreamMessage::frame("AAEC", vec![]).encode().unwrap();
        assert_eq!(frame, r#"{"type":"frame","image":"AAEC","detections":[]}"#);
    }

    #[test]
    fn detection_label_formats_percentage() {
        assert_eq!(Detection::new("person", 92.0).label(), "person — 92%");
        assert_eq!(Detection::new("dog", 45.67).label(), "dog — 45.67%");
    }
}
