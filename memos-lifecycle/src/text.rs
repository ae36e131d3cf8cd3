//! Text helpers shared by the formatter, the extractor and the hooks.
//!
//! All limits are counted in characters, never bytes, so multi-byte
//! content is never split inside a code point.

use serde_json::Value;

/// Marker appended to anything that was cut short.
pub const ELLIPSIS: &str = "...";

/// Returns the first `max_chars` characters of `s`.
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncates to `max_chars` characters, appending [`ELLIPSIS`] when cut.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    let head = take_chars(s, max_chars);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{head}{ELLIPSIS}")
    }
}

/// Renders an arbitrary JSON value as text and truncates it.
///
/// Strings are used verbatim, `null`/missing values become the empty
/// string, everything else is serialized as compact JSON.
pub fn truncate_value(value: Option<&Value>, max_chars: usize) -> String {
    let rendered = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    truncate_with_ellipsis(&rendered, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_chars() {
        assert_eq!(take_chars("hello", 10), "hello");
        assert_eq!(take_chars("hello world", 5), "hello");
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("", 3), "");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 100), "short");
        assert_eq!(truncate_with_ellipsis("exactly", 7), "exactly");
        assert_eq!(truncate_with_ellipsis("this is a long text", 10), "this is a ...");
        // never panics on multi-byte boundaries
        assert_eq!(truncate_with_ellipsis("日本語のテキスト", 3), "日本語...");
    }

    #[test]
    fn test_truncate_value() {
        assert_eq!(truncate_value(None, 10), "");
        assert_eq!(truncate_value(Some(&Value::Null), 10), "");
        assert_eq!(truncate_value(Some(&json!("plain")), 10), "plain");
        assert_eq!(truncate_value(Some(&json!({"a": 1})), 100), r#"{"a":1}"#);
        assert_eq!(truncate_value(Some(&json!([1, 2, 3, 4])), 4), "[1,2...");
    }
}
