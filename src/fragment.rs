//! Structural repair for a single, possibly truncated JSON value.
//!
//! While a model is still emitting, the accumulated text is usually cut off
//! mid-value. [`parse_fragment`] first tries a strict parse, then a cheap
//! structural completion, and, only once the stream has ended, the full
//! heuristic repair in [`crate::repair`]. Both outcomes are explicit:
//! a fully parsed value or a typed failure, never a half-applied fix.

use serde_json::Value;
use thiserror::Error;

use crate::repair::repair_json;

/// Failure modes of [`parse_fragment`].
#[derive(Debug, Error)]
pub enum FragmentError {
    /// The text is not yet a complete JSON value. Expected and frequent
    /// mid-stream; the caller waits for more content.
    #[error("fragment is not yet a complete JSON value")]
    Incomplete,

    /// Terminal text failed to parse even after repair.
    #[error("unparseable JSON after repair: {detail}")]
    Unparseable { detail: String },
}

/// Parse `text` as one JSON value, repairing truncation when possible.
///
/// - Strict parse first; on success the value is returned as-is.
/// - On failure with `is_final == false`: attempt a structural completion
///   (see [`complete_structure`]) and re-parse. If that fails too, the
///   content simply has not arrived yet: `Incomplete`.
/// - On failure with `is_final == true`: run the general repair pipeline
///   and parse its output, else `Unparseable`.
///
/// The input is never mutated and a returned value is always the result of
/// a strict parse of *some* completed text.
pub fn parse_fragment(text: &str, is_final: bool) -> Result<Value, FragmentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FragmentError::Incomplete);
    }

    let strict_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if !is_final {
        if let Some(candidate) = complete_structure(trimmed) {
            if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                return Ok(value);
            }
        }
        return Err(FragmentError::Incomplete);
    }

    if let Some(repaired) = repair_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return Ok(value);
        }
    }
    Err(FragmentError::Unparseable {
        detail: strict_err.to_string(),
    })
}

/// Best-effort completion of a truncated value by balancing delimiters.
///
/// Counts unmatched `{`/`}` and `[`/`]` over the whole string, strips one
/// trailing dangling comma, and appends the missing closers, brackets
/// before braces.
///
/// The count is deliberately *not* string-aware: mid-string truncation is
/// the common case while content is arriving, and whether the cut landed
/// inside an open string is undecidable without a real tokenizer. A
/// delimiter inside a string skews the count, the re-parse fails, and the
/// caller just waits for more content, which is the correct outcome for a
/// half-open string anyway. The terminal repair path and the record
/// boundary scanner are string-aware; this one intentionally is not.
pub(crate) fn complete_structure(text: &str) -> Option<String> {
    let mut braces = 0i32;
    let mut brackets = 0i32;
    for ch in text.chars() {
        match ch {
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
    }
    if braces < 0 || brackets < 0 || (braces == 0 && brackets == 0) {
        return None;
    }

    let mut out = text.trim_end().to_string();
    if out.ends_with(',') {
        out.pop();
    }
    for _ in 0..brackets {
        out.push(']');
    }
    for _ in 0..braces {
        out.push('}');
    }
    Some(out)
}
