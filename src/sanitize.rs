//! Presentation-wrapper stripping for accumulated model text.
//!
//! Models routinely wrap generated JSON in markdown fences even when asked
//! not to. [`sanitize`] removes a leading fence marker (optionally tagged),
//! a trailing fence marker, and stray backticks at both ends, so every parse
//! attempt sees bare JSON.

/// Strip markdown fence markers and stray backticks from both ends of `text`.
///
/// Pure and total: never panics, never allocates more than the output.
/// Idempotent: `sanitize(&sanitize(t)) == sanitize(t)`.
///
/// # Example
///
/// ```
/// use resume_stream::sanitize::sanitize;
///
/// assert_eq!(sanitize("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(sanitize("{\"a\": 1}"), "{\"a\": 1}");
/// ```
pub fn sanitize(text: &str) -> String {
    let s = text.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    let mut out = s.trim();
    loop {
        let next = out.trim_matches('`').trim();
        if next == out {
            break;
        }
        out = next;
    }
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        assert_eq!(sanitize("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(sanitize("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn strips_leading_fence_only() {
        // Mid-stream: the closing fence has not arrived yet.
        assert_eq!(sanitize("```json\n{\"profile\": \"Sr"), "{\"profile\": \"Sr");
    }

    #[test]
    fn strips_stray_backticks() {
        assert_eq!(sanitize("`{\"a\": 1}`"), "{\"a\": 1}");
        assert_eq!(sanitize("``{\"a\": 1}``"), "{\"a\": 1}");
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(sanitize("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(sanitize("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn empty_and_fence_only() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("```"), "");
        assert_eq!(sanitize("``````"), "");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "```json\n{\"a\": 1}\n```",
            "```\n[1, 2]\n```",
            "`x`",
            "{\"a\": 1}",
            "",
            "```",
            "``` {\"a\": 1} ```",
            "`` `{\"a\": 1}` ``",
            "```json\n{\"profile\": \"un终",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input:?}");
        }
    }
}
