//! Typed decode of the event payloads carried on the generation stream.
//!
//! Several generations of the wire format co-exist: the current
//! `type`-tagged envelopes, bare question/answer records, and a legacy
//! error shape with no tag at all. Payloads decode into one sum type so the
//! controller dispatches by pattern match instead of probing for fields.
//! Decode order encodes priority: tagged shapes win, then bare records,
//! then the legacy error; whatever is left (including the `{}` keep-alive)
//! lands in [`WireEvent::Ignored`].

use serde::Deserialize;
use serde_json::Value;

use crate::boundary::QaPair;

/// One decoded stream payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireEvent {
    /// A `type`-tagged envelope (current wire format plus legacy section
    /// events).
    Tagged(TaggedEvent),
    /// A bare question/answer record, emitted directly by the Q&A stream
    /// without the chunk envelope.
    Qa(QaPair),
    /// Legacy untagged error shape: `{"error": "...", "message": "..."}`.
    LegacyError {
        error: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Anything else: the `{}` keep-alive or an unrecognized shape. Logged
    /// and ignored by the controller.
    Ignored(Value),
}

/// The `type`-tagged envelopes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaggedEvent {
    /// Incremental fragment: a title update, a content delta, or both.
    Chunk {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    /// Terminal completion. `content` is itself a JSON-encoded
    /// authoritative record that supersedes all partial reconstructions.
    #[serde(rename_all = "camelCase")]
    GenerationComplete {
        #[serde(default)]
        document_id: Option<String>,
        content: String,
    },
    /// Explicit error event.
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    /// Legacy: a named section began generating.
    SectionStarted {
        #[serde(default)]
        section: Option<String>,
    },
    /// Legacy: content delta scoped to a section.
    SectionContent {
        #[serde(default)]
        section: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    /// Legacy: a named section finished, optionally with its final content.
    SectionCompleted {
        #[serde(default)]
        section: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    /// Legacy: the generated document was persisted server-side.
    #[serde(rename_all = "camelCase")]
    DocumentSaved {
        #[serde(default)]
        document_id: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// Legacy: a section failed.
    SectionError {
        #[serde(default)]
        section: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// An event tag this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    /// Decode one `data:` payload. A failure here is a control-frame decode
    /// failure: the caller logs it and skips the event.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_title_chunk() {
        let event = WireEvent::decode(r#"{"type":"chunk","title":"Backend Engineer"}"#).unwrap();
        match event {
            WireEvent::Tagged(TaggedEvent::Chunk { title, content }) => {
                assert_eq!(title.as_deref(), Some("Backend Engineer"));
                assert!(content.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_content_chunk() {
        let event = WireEvent::decode(r#"{"type":"chunk","content":"{\"profile\":\"Sr "}"#).unwrap();
        match event {
            WireEvent::Tagged(TaggedEvent::Chunk { content, .. }) => {
                assert_eq!(content.as_deref(), Some(r#"{"profile":"Sr "#));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_generation_complete() {
        let payload = r#"{"type":"generationComplete","documentId":"doc-7","content":"{}"}"#;
        match WireEvent::decode(payload).unwrap() {
            WireEvent::Tagged(TaggedEvent::GenerationComplete {
                document_id,
                content,
            }) => {
                assert_eq!(document_id.as_deref(), Some("doc-7"));
                assert_eq!(content, "{}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_tagged_error() {
        match WireEvent::decode(r#"{"type":"error","message":"model unavailable"}"#).unwrap() {
            WireEvent::Tagged(TaggedEvent::Error { message, .. }) => {
                assert_eq!(message.as_deref(), Some("model unavailable"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_legacy_error() {
        match WireEvent::decode(r#"{"error":"boom"}"#).unwrap() {
            WireEvent::LegacyError { error, message } => {
                assert_eq!(error, "boom");
                assert!(message.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_bare_qa_record() {
        match WireEvent::decode(r#"{"question":"Q1","answer":"A1"}"#).unwrap() {
            WireEvent::Qa(pair) => {
                assert_eq!(pair.question, "Q1");
                assert_eq!(pair.answer, "A1");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tagged_wins_over_qa_shape() {
        // A tagged payload that also carries question/answer fields must
        // dispatch on its tag.
        let payload = r#"{"type":"chunk","content":"x","question":"q","answer":"a"}"#;
        assert!(matches!(
            WireEvent::decode(payload).unwrap(),
            WireEvent::Tagged(TaggedEvent::Chunk { .. })
        ));
    }

    #[test]
    fn keep_alive_is_ignored_shape() {
        match WireEvent::decode("{}").unwrap() {
            WireEvent::Ignored(value) => {
                assert!(value.as_object().is_some_and(|m| m.is_empty()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_decodes_to_unknown() {
        assert!(matches!(
            WireEvent::decode(r#"{"type":"sectionPing","section":"x"}"#).unwrap(),
            WireEvent::Tagged(TaggedEvent::Unknown)
        ));
    }

    #[test]
    fn legacy_section_events_decode() {
        assert!(matches!(
            WireEvent::decode(r#"{"type":"sectionStarted","section":"profile"}"#).unwrap(),
            WireEvent::Tagged(TaggedEvent::SectionStarted { .. })
        ));
        assert!(matches!(
            WireEvent::decode(r#"{"type":"sectionCompleted","section":"profile"}"#).unwrap(),
            WireEvent::Tagged(TaggedEvent::SectionCompleted { .. })
        ));
        assert!(matches!(
            WireEvent::decode(r#"{"type":"documentSaved","documentId":"d1"}"#).unwrap(),
            WireEvent::Tagged(TaggedEvent::DocumentSaved { .. })
        ));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(WireEvent::decode(r#"{"type":"#).is_err());
    }

    #[test]
    fn non_object_payload_is_ignored_shape() {
        assert!(matches!(
            WireEvent::decode(r#""just a string""#).unwrap(),
            WireEvent::Ignored(Value::String(_))
        ));
    }
}
