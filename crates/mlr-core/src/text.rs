//! Small text helpers shared by the parsers, tracer and stage units.

/// Preview length used for event payloads.
pub const PREVIEW_CHARS: usize = 200;

/// First `max_chars` characters of `text` (never splits a code point).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Trimmed prefix of `text`, or `default` when that prefix is blank.
pub fn prefix_or(text: &str, max_chars: usize, default: &str) -> String {
    let prefix = truncate_chars(text.trim(), max_chars).trim();
    if prefix.is_empty() {
        default.to_string()
    } else {
        prefix.to_string()
    }
}

/// Trimmed `value` when it has content, otherwise `default`.
pub fn non_empty_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Last path segment of a type name, e.g. `ResearchIdea` for
/// `mlr_core::domain::artifact::ResearchIdea`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 200), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_prefix_or_falls_back_on_blank() {
        assert_eq!(prefix_or("   \n  ", 10, "fallback"), "fallback");
        assert_eq!(prefix_or("  abcdef  ", 3, "fallback"), "abc");
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or(Some("  x "), "d"), "x");
        assert_eq!(non_empty_or(Some("   "), "d"), "d");
        assert_eq!(non_empty_or(None, "d"), "d");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
        assert_eq!(short_type_name::<crate::domain::ResearchIdea>(), "ResearchIdea");
    }
}
