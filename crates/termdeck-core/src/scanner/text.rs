/// Get the last `n` characters of a string, respecting UTF-8 boundaries
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Drop leading characters so that at most `cap` remain
pub(crate) fn truncate_front(buffer: &mut String, cap: usize) {
    let keep_from = buffer.len() - tail_chars(buffer, cap).len();
    if keep_from > 0 {
        buffer.drain(..keep_from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_chars_short_string() {
        assert_eq!(tail_chars("hello", 10), "hello");
    }

    #[test]
    fn test_tail_chars_exact_length() {
        assert_eq!(tail_chars("hello", 5), "hello");
    }

    #[test]
    fn test_tail_chars_truncated() {
        assert_eq!(tail_chars("hello world", 5), "world");
    }

    #[test]
    fn test_tail_chars_counts_characters_not_bytes() {
        // Each box-drawing glyph is 3 bytes
        assert_eq!(tail_chars("╭──╮", 2), "─╮");
    }

    #[test]
    fn test_tail_chars_zero() {
        assert_eq!(tail_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_front_keeps_trailing_window() {
        let mut buf = "abcdef".to_string();
        truncate_front(&mut buf, 4);
        assert_eq!(buf, "cdef");

        let mut short = "ab".to_string();
        truncate_front(&mut short, 4);
        assert_eq!(short, "ab");
    }

    #[test]
    fn test_truncate_front_multibyte() {
        let mut buf = "│a│b│".to_string();
        truncate_front(&mut buf, 3);
        assert_eq!(buf, "│b│");
    }
}
