//! Heuristic JSON repair for terminal model output.
//!
//! When a stream ends, the accumulated text is supposed to be one complete
//! JSON document, but models leave it broken in recurring ways: prose around
//! the payload, single quotes, bare keys, unescaped inner quotes, missing
//! commas, raw newlines inside strings, trailing commas, and unclosed
//! delimiters. [`repair_json`] applies a fixed sequence of string-aware
//! passes and validates the result with `serde_json`. No regex is used.
//!
//! This is the *terminal* repair path. The cheap structural completion used
//! while content is still arriving lives in [`crate::fragment`].

use serde_json::Value;

/// Attempt to repair a malformed JSON document.
///
/// Returns the repaired string if fixes produced valid JSON. Returns `None`
/// if the input was already valid (no repair needed) or is beyond repair.
///
/// Passes applied (in order):
/// 1. Isolate the payload from surrounding prose
/// 2. Convert single-quoted strings to double-quoted
/// 3. Quote bare object keys
/// 4. Escape unescaped quotes inside string values
/// 5. Insert missing commas between adjacent values
/// 6. Escape raw control characters inside strings
/// 7. Remove trailing commas before `}` / `]`
/// 8. Close an open string and unclosed delimiters
pub fn repair_json(broken: &str) -> Option<String> {
    if serde_json::from_str::<Value>(broken).is_ok() {
        return None;
    }

    let isolated = isolate(broken)?;
    let mut s = normalize_single_quotes(isolated);
    s = quote_bare_keys(&s);
    s = heal_inner_quotes(&s);
    s = insert_missing_commas(&s);
    s = escape_raw_controls(&s);
    s = drop_trailing_commas(&s);
    s = close_delimiters(&s);

    if serde_json::from_str::<Value>(&s).is_ok() {
        Some(s)
    } else {
        None
    }
}

/// Slice out the first JSON value, dropping prose before and after it.
/// If the value never closes, everything from its opening delimiter on is
/// kept for the later balancing pass.
fn isolate(s: &str) -> Option<&str> {
    let start = s.find(|c| c == '{' || c == '[')?;
    let tail = &s[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in tail.char_indices() {
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
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth <= 0 {
                    return Some(&tail[..i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    Some(tail)
}

/// Convert single-quoted strings to double-quoted when both quotes sit at a
/// value boundary. Apostrophes inside double-quoted strings are untouched.
fn normalize_single_quotes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_double = false;
    let mut escaped = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if in_double {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_double = false;
            }
            i += 1;
            continue;
        }
        if ch == '"' {
            in_double = true;
            out.push(ch);
            i += 1;
            continue;
        }
        if ch == '\'' && boundary_before(&chars, i) {
            if let Some(close) = closing_single_quote(&chars, i + 1) {
                if boundary_after(&chars, close) {
                    out.push('"');
                    for &c in &chars[i + 1..close] {
                        if c == '"' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('"');
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push(ch);
        i += 1;
    }
    out
}

fn boundary_before(chars: &[char], i: usize) -> bool {
    let mut j = i;
    while j > 0 {
        j -= 1;
        if chars[j].is_whitespace() {
            continue;
        }
        return matches!(chars[j], '{' | '[' | ':' | ',');
    }
    true
}

fn boundary_after(chars: &[char], i: usize) -> bool {
    let mut j = i + 1;
    while j < chars.len() {
        if chars[j].is_whitespace() {
            j += 1;
            continue;
        }
        return matches!(chars[j], '}' | ']' | ':' | ',');
    }
    true
}

fn closing_single_quote(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '\'' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Quote bare identifiers in key position: `{key: 1}` -> `{"key": 1}`.
fn quote_bare_keys(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if ch == '"' {
            in_string = true;
            out.push(ch);
            i += 1;
            continue;
        }
        out.push(ch);
        i += 1;
        if ch == '{' || ch == ',' {
            while i < chars.len() && chars[i].is_whitespace() {
                out.push(chars[i]);
                i += 1;
            }
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            if i > start {
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let is_key = j < chars.len() && chars[j] == ':';
                if is_key {
                    out.push('"');
                }
                out.extend(&chars[start..i]);
                if is_key {
                    out.push('"');
                }
            }
        }
    }
    out
}

/// Escape `"` characters that appear *inside* a string value. A quote only
/// terminates a string when the next significant character continues the
/// surrounding JSON structure (`,` `}` `]` `:` `"` or end of input).
fn heal_inner_quotes(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    for i in 0..chars.len() {
        let ch = chars[i];
        if !in_string {
            out.push(ch);
            if ch == '"' {
                in_string = true;
                escaped = false;
            }
            continue;
        }
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            out.push(ch);
            escaped = true;
            continue;
        }
        if ch == '"' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let terminates = j >= chars.len() || matches!(chars[j], ',' | '}' | ']' | ':' | '"');
            if terminates {
                out.push('"');
                in_string = false;
            } else {
                out.push('\\');
                out.push('"');
            }
            continue;
        }
        out.push(ch);
    }
    out
}

/// Insert a comma between two adjacent values: `{"a": 1 "b": 2}` or
/// `[{"a": 1} {"b": 2}]`.
fn insert_missing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut prev_sig: Option<char> = None;
    for ch in s.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
                prev_sig = Some('"');
            }
            continue;
        }
        if ch.is_whitespace() {
            out.push(ch);
            continue;
        }
        let starts_value =
            matches!(ch, '"' | '{' | '[' | 't' | 'f' | 'n' | '-') || ch.is_ascii_digit();
        let after_value = matches!(prev_sig, Some('"' | '}' | ']'))
            || prev_sig.is_some_and(|p| p.is_ascii_alphanumeric());
        if starts_value && after_value {
            out.push(',');
        }
        out.push(ch);
        if ch == '"' {
            in_string = true;
            escaped = false;
        }
        prev_sig = Some(ch);
    }
    out
}

/// Escape raw newlines, carriage returns, and tabs inside string values.
fn escape_raw_controls(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    for ch in s.chars() {
        if in_string {
            if escaped {
                out.push(ch);
                escaped = false;
            } else if ch == '\\' {
                out.push(ch);
                escaped = true;
            } else if ch == '"' {
                out.push(ch);
                in_string = false;
            } else if ch == '\n' {
                out.push_str("\\n");
            } else if ch == '\r' {
                out.push_str("\\r");
            } else if ch == '\t' {
                out.push_str("\\t");
            } else {
                out.push(ch);
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
            escaped = false;
        }
        out.push(ch);
    }
    out
}

/// Remove commas that sit directly before `}` or `]`.
fn drop_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if ch == '"' {
            in_string = true;
            out.push(ch);
            i += 1;
            continue;
        }
        if ch == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && matches!(chars[j], '}' | ']') {
                i += 1;
                continue;
            }
        }
        out.push(ch);
        i += 1;
    }
    out
}

/// Close an open string, trim structures that cannot be closed as-is
/// (dangling comma, key with no value, orphan key), then append the missing
/// closing delimiters in proper nesting order.
fn close_delimiters(s: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in s.chars() {
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
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = s.to_string();
    if in_string {
        out.push('"');
    }

    // A dangling separator or a key with no value cannot precede a closer.
    loop {
        let t = out.trim_end();
        let keep = if let Some(rest) = t.strip_suffix(',') {
            Some(rest.len())
        } else if let Some(rest) = t.strip_suffix(':') {
            let rest = rest.trim_end();
            quoted_suffix_start(rest).map(|key_open| {
                let mut cut = rest[..key_open].trim_end();
                if let Some(c) = cut.strip_suffix(',') {
                    cut = c.trim_end();
                }
                cut.len()
            })
        } else {
            None
        };
        match keep {
            Some(len) => out.truncate(len),
            None => break,
        }
    }

    // Orphan key: a closed string directly after `,` or `{` with no colon.
    if stack.last() == Some(&'}') {
        let t = out.trim_end();
        let keep = quoted_suffix_start(t).and_then(|key_open| {
            let before = t[..key_open].trim_end();
            if let Some(c) = before.strip_suffix(',') {
                Some(c.trim_end().len())
            } else if before.ends_with('{') {
                Some(before.len())
            } else {
                None
            }
        });
        if let Some(len) = keep {
            out.truncate(len);
        }
    }

    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// If `s` ends with a complete quoted string, return the byte index of its
/// opening quote.
fn quoted_suffix_start(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.is_empty() || b[b.len() - 1] != b'"' {
        return None;
    }
    let mut i = b.len() - 1;
    while i > 0 {
        i -= 1;
        if b[i] == b'"' {
            let mut backslashes = 0;
            let mut j = i;
            while j > 0 && b[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 0 {
                return Some(i);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &str) -> Value {
        let repaired = repair_json(input).unwrap();
        serde_json::from_str(&repaired).unwrap()
    }

    #[test]
    fn already_valid_needs_no_repair() {
        assert!(repair_json(r#"{"a": 1}"#).is_none());
        assert!(repair_json(r#"{"text": "don't stop"}"#).is_none());
    }

    #[test]
    fn hopeless_input() {
        assert!(repair_json("no json here at all").is_none());
        assert!(repair_json("").is_none());
    }

    #[test]
    fn prose_around_payload() {
        let v = parsed(r#"Sure! Here is the result: {"a": 1} — hope that helps."#);
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn single_quotes() {
        let v = parsed("{'role': 'engineer'}");
        assert_eq!(v["role"], "engineer");
    }

    #[test]
    fn bare_keys() {
        let v = parsed(r#"{profile: "text", skills: ["a"]}"#);
        assert_eq!(v["profile"], "text");
        assert_eq!(v["skills"][0], "a");
    }

    #[test]
    fn unescaped_inner_quotes() {
        let v = parsed(r#"{"quote": "he said "ship it" today"}"#);
        assert_eq!(v["quote"], r#"he said "ship it" today"#);
    }

    #[test]
    fn missing_comma_between_pairs() {
        let v = parsed(r#"{"a": 1 "b": 2}"#);
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], 2);
    }

    #[test]
    fn missing_comma_between_array_items() {
        let v = parsed(r#"[{"a": 1} {"a": 2}]"#);
        assert_eq!(v.as_array().unwrap().len(), 2);
    }

    #[test]
    fn raw_newline_in_string() {
        let v = parsed("{\"text\": \"line one\nline two\"}");
        assert_eq!(v["text"], "line one\nline two");
    }

    #[test]
    fn trailing_commas() {
        let v = parsed(r#"{"a": [1, 2,], "b": 3,}"#);
        assert_eq!(v["a"].as_array().unwrap().len(), 2);
        assert_eq!(v["b"], 3);
    }

    #[test]
    fn unterminated_string_and_object() {
        let v = parsed(r#"{"profile": "Senior eng"#);
        assert_eq!(v["profile"], "Senior eng");
    }

    #[test]
    fn nested_unclosed_delimiters() {
        let v = parsed(r#"{"items": [{"name": "a"}, {"name": "b""#);
        assert_eq!(v["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn dangling_key_trimmed() {
        let v = parsed(r#"{"year": 1999, "rating":"#);
        assert_eq!(v["year"], 1999);
        assert!(v.get("rating").is_none());
    }

    #[test]
    fn orphan_key_trimmed() {
        let v = parsed(r#"{"year": 1999, "rating""#);
        assert_eq!(v["year"], 1999);
        assert!(v.get("rating").is_none());
    }

    #[test]
    fn dangling_separator_trimmed() {
        let v = parsed(r#"{"a": 1,"#);
        assert_eq!(v["a"], 1);
    }
}
