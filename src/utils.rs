//! Small text helpers shared by the store, the coach and the chat channel.

/// Truncates a string to at most `max_chars` characters, adding "..." if truncated.
///
/// Counts characters, not bytes, so multi-byte input never splits mid-codepoint.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    truncate_impl(s, max_chars, "...")
}

/// Truncates to exactly `max_chars` characters with no suffix.
pub fn clip_chars(s: &str, max_chars: usize) -> String {
    truncate_impl(s, max_chars, "")
}

fn truncate_impl(s: &str, max_chars: usize, suffix: &str) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    let char_count = s.chars().count();
    if char_count <= max_chars {
        return s.to_string();
    }

    let suffix_len = suffix.chars().count();
    if max_chars <= suffix_len {
        return suffix.chars().take(max_chars).collect();
    }

    let truncated: String = s.chars().take(max_chars - suffix_len).collect();
    format!("{}{}", truncated, suffix)
}

/// Collapse every run of whitespace (including newlines) into a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
