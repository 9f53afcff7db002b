//! Shared utility functions.

/// Count the characters in a string.
///
/// Length limits in the vault are expressed in characters, so a value of
/// Japanese text is measured the same way as ASCII.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to at most `max` characters.
///
/// Returns the (possibly shortened) prefix and whether anything was cut.
/// Never splits a multi-byte character.
///
/// # Examples
///
/// ```
/// use vault::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 10), ("hello", false));
/// assert_eq!(truncate_chars("hello", 3), ("hel", true));
/// assert_eq!(truncate_chars("日本語テキスト", 3), ("日本語", true));
/// ```
pub fn truncate_chars(s: &str, max: usize) -> (&str, bool) {
    match s.char_indices().nth(max) {
        Some((idx, _)) => (&s[..idx], true),
        None => (s, false),
    }
}
