//! Generation request parameters sent to the chunk source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which artifact the server should generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// Structured résumé record.
    Resume,
    /// Cover letter (streams through the structured-record path).
    CoverLetter,
    /// Interview question/answer sequence.
    InterviewQa,
}

/// Body of the long-lived generation request.
///
/// # Example
///
/// ```
/// use resume_stream::request::{DocumentKind, GenerationRequest};
///
/// let request = GenerationRequest::new(DocumentKind::Resume, "Senior Rust engineer...")
///     .with_language("en")
///     .with_option("tone", "concise");
/// assert_eq!(request.kind, DocumentKind::Resume);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub kind: DocumentKind,
    /// The job description the generation is tailored to.
    pub job_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-form provider options forwarded verbatim.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl GenerationRequest {
    pub fn new(kind: DocumentKind, job_description: impl Into<String>) -> Self {
        Self {
            kind,
            job_description: job_description.into(),
            language: None,
            options: Value::Null,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Insert one provider option, creating the options object on first use.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.options.is_object() {
            self.options = Value::Object(Default::default());
        }
        if let Some(map) = self.options.as_object_mut() {
            map.insert(key.into(), value.into());
        }
        self
    }
}
