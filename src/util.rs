//! Shared utility functions

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Safely truncate a string to at most `max_bytes` while respecting UTF-8 boundaries.
///
/// If the string is already shorter than `max_bytes`, returns it unchanged.
/// Otherwise, finds the last valid UTF-8 character boundary at or before `max_bytes`
/// and returns a slice up to that point.
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fit a string into `width` terminal columns, marking cuts with an ellipsis
///
/// Stream URLs and log details are routinely wider than their table column;
/// CJK and emoji count as two columns.
pub fn fit_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let budget = width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_utf8_boundary() {
        // Each character is 3 bytes
        let s = "日本語";
        assert_eq!(truncate_utf8_safe(s, 4), "日");
        assert_eq!(truncate_utf8_safe(s, 6), "日本");
    }

    #[test]
    fn test_truncate_to_zero() {
        assert_eq!(truncate_utf8_safe("hello", 0), "");
    }

    #[test]
    fn test_fit_width_short_string_unchanged() {
        assert_eq!(fit_width("rtmp://a", 20), "rtmp://a");
        assert_eq!(fit_width("exact", 5), "exact");
    }

    #[test]
    fn test_fit_width_adds_ellipsis() {
        assert_eq!(fit_width("https://cb.example/alice", 10), "https://c…");
        assert_eq!(fit_width("https://cb.example/alice", 10).width(), 10);
    }

    #[test]
    fn test_fit_width_wide_chars() {
        // Two columns each; a half-fitting glyph is dropped
        let fitted = fit_width("日本語テキスト", 6);
        assert_eq!(fitted, "日本…");
        assert!(fitted.width() <= 6);
    }

    #[test]
    fn test_fit_width_zero() {
        assert_eq!(fit_width("anything", 0), "");
    }
}
