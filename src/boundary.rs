//! Complete-object boundary scanning for record-sequence streams.
//!
//! The interview-Q&A stream is a growing sequence of discrete JSON objects,
//! not one document. [`scan`] walks the accumulated buffer with quote- and
//! escape-aware brace counting, emits every complete well-formed pair in
//! arrival order, and reports how far the buffer was consumed; the trailing
//! truncated object stays behind untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One interview question/answer record. Only ever produced complete;
/// the scanner never emits a pair missing either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Result of one [`scan`] pass over the buffer.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Complete pairs, in arrival order.
    pub complete: Vec<QaPair>,
    /// Byte offset up to which the buffer was consumed. The remainder
    /// (`&buffer[consumed..]`) is always a suffix of the input.
    pub consumed: usize,
}

/// Find every complete object boundary in `buffer`.
///
/// Linear scan maintaining an in-string flag (toggled by unescaped quotes)
/// and a brace depth counter that only moves outside strings. Whenever the
/// depth returns to zero, the candidate substring is strictly parsed:
///
/// - parses with non-empty `question` and `answer` → emitted, scan advances;
/// - parses but is off-shape → dropped, scan still advances (a well-formed
///   object must not jam the stream);
/// - fails to parse → treated as not yet complete, the scan stops and the
///   candidate becomes part of the remainder.
///
/// No byte of input is ever attributed to two different objects.
pub fn scan(buffer: &str) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;
    let mut object_start = 0usize;

    for (i, ch) in buffer.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    object_start = i;
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = i + 1;
                    let candidate = &buffer[object_start..end];
                    match serde_json::from_str::<Value>(candidate) {
                        Ok(value) => {
                            outcome.consumed = end;
                            match pair_from_value(&value) {
                                Some(pair) => outcome.complete.push(pair),
                                None => {
                                    debug!("dropping complete object without question/answer")
                                }
                            }
                        }
                        Err(_) => return outcome,
                    }
                }
            }
            _ => {}
        }
    }

    outcome
}

/// Apply a scan to `buffer`, removing everything that was consumed.
pub fn drain_complete(buffer: &mut String) -> Vec<QaPair> {
    let outcome = scan(buffer);
    if outcome.consumed > 0 {
        buffer.drain(..outcome.consumed);
    }
    outcome.complete
}

/// Extract a complete pair from a parsed object; both fields must be
/// non-empty strings.
pub(crate) fn pair_from_value(value: &Value) -> Option<QaPair> {
    let question = value.get("question")?.as_str()?;
    let answer = value.get("answer")?.as_str()?;
    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(QaPair {
        question: question.to_string(),
        answer: answer.to_string(),
    })
}
