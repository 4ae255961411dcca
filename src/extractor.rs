//! Target-shape extractors over the shared stream buffer.
//!
//! Both stream flavors accumulate text and extract whatever is safely
//! parseable into published state, differing only in the target shape.
//! [`Extract`] captures that difference:
//! [`ResumeExtractor`] reconstructs one evolving structured record through
//! structural repair and field reconciliation, [`QaExtractor`] grows a list
//! of discrete records through boundary scanning.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::boundary::{self, QaPair};
use crate::fragment::{parse_fragment, FragmentError};
use crate::resume::{reconcile, ResumeDraft};
use crate::sanitize::sanitize;

/// One extractor instance: an owned buffer plus the state reconstructed
/// from it. Owned by exactly one stream session; recreated on restart.
pub trait Extract: Send + 'static {
    /// The published state shape.
    type Output: Clone + Default + PartialEq + Serialize + Send + Sync + 'static;

    /// Append a content fragment and attempt a non-final extraction.
    /// `Ok(true)` means state advanced and should be published; `Ok(false)`
    /// means the buffer is not parseable yet and the caller waits.
    fn ingest(&mut self, fragment: &str) -> Result<bool, FragmentError>;

    /// One last extraction attempt at clean end-of-stream, with the
    /// repair-everything final pass enabled.
    fn finish(&mut self) -> Result<bool, FragmentError>;

    /// Replace (not merge) all state with an authoritative payload.
    /// On failure the previous state is left untouched.
    fn adopt(&mut self, authoritative: &str) -> Result<(), FragmentError>;

    /// A bare record payload arrived outside the chunk envelope. Returns
    /// true if this extractor consumed it.
    fn ingest_record(&mut self, _raw: &str) -> bool {
        false
    }

    /// Current reconstructed state.
    fn snapshot(&self) -> Self::Output;

    /// Drop buffer and state, ready for a fresh stream.
    fn reset(&mut self);
}

/// Structured-record extractor: one evolving [`ResumeDraft`].
#[derive(Debug, Default)]
pub struct ResumeExtractor {
    buffer: String,
    draft: ResumeDraft,
}

impl ResumeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw accumulated text, for diagnostics.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    fn extract(&mut self, is_final: bool) -> Result<bool, FragmentError> {
        let text = sanitize(&self.buffer);
        if text.is_empty() {
            return Ok(false);
        }
        match parse_fragment(&text, is_final) {
            Ok(value) => {
                self.draft = reconcile(&self.draft, &value);
                Ok(true)
            }
            Err(FragmentError::Incomplete) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl Extract for ResumeExtractor {
    type Output = ResumeDraft;

    fn ingest(&mut self, fragment: &str) -> Result<bool, FragmentError> {
        self.buffer.push_str(fragment);
        self.extract(false)
    }

    fn finish(&mut self) -> Result<bool, FragmentError> {
        self.extract(true)
    }

    fn adopt(&mut self, authoritative: &str) -> Result<(), FragmentError> {
        let text = sanitize(authoritative);
        let value = parse_fragment(&text, true).map_err(|err| match err {
            FragmentError::Incomplete => FragmentError::Unparseable {
                detail: "empty authoritative payload".to_string(),
            },
            other => other,
        })?;
        self.draft = reconcile(&ResumeDraft::default(), &value);
        self.buffer.clear();
        Ok(())
    }

    fn snapshot(&self) -> ResumeDraft {
        self.draft.clone()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.draft = ResumeDraft::default();
    }
}

/// Record-sequence extractor: a growing list of complete [`QaPair`]s.
#[derive(Debug, Default)]
pub struct QaExtractor {
    buffer: String,
    pairs: Vec<QaPair>,
}

impl QaExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extract for QaExtractor {
    type Output = Vec<QaPair>;

    fn ingest(&mut self, fragment: &str) -> Result<bool, FragmentError> {
        self.buffer.push_str(fragment);
        let mut text = sanitize(&self.buffer);
        let drained = boundary::drain_complete(&mut text);
        self.buffer = text;
        if drained.is_empty() {
            Ok(false)
        } else {
            self.pairs.extend(drained);
            Ok(true)
        }
    }

    fn finish(&mut self) -> Result<bool, FragmentError> {
        let mut text = sanitize(&self.buffer);
        let drained = boundary::drain_complete(&mut text);
        let mut advanced = !drained.is_empty();
        self.pairs.extend(drained);

        // The trailing truncated object gets one repair attempt now that no
        // more content is coming.
        let leftover = text.trim();
        if !leftover.is_empty() {
            if let Ok(value) = parse_fragment(leftover, true) {
                if let Some(pair) = boundary::pair_from_value(&value) {
                    self.pairs.push(pair);
                    advanced = true;
                }
            }
        }
        self.buffer.clear();
        Ok(advanced)
    }

    fn adopt(&mut self, authoritative: &str) -> Result<(), FragmentError> {
        let text = sanitize(authoritative);
        let value = parse_fragment(&text, true).map_err(|err| match err {
            FragmentError::Incomplete => FragmentError::Unparseable {
                detail: "empty authoritative payload".to_string(),
            },
            other => other,
        })?;
        let items = match &value {
            Value::Array(items) => items.clone(),
            Value::Object(map) => map
                .get("items")
                .or_else(|| map.get("questions"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        self.pairs = items.iter().filter_map(boundary::pair_from_value).collect();
        self.buffer.clear();
        Ok(())
    }

    fn ingest_record(&mut self, raw: &str) -> bool {
        match self.ingest(raw) {
            Ok(advanced) => advanced,
            Err(err) => {
                debug!(%err, "bare record did not extract");
                false
            }
        }
    }

    fn snapshot(&self) -> Vec<QaPair> {
        self.pairs.clone()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.pairs.clear();
    }
}
