//! Display-name text helpers.
//!
//! Host display names are capped in characters, not bytes, and `&s[..n]`
//! panics when `n` lands inside a multi-byte character. These helpers keep
//! truncation char-safe.

/// Truncate a string to at most `max_chars` characters.
#[inline]
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Number of characters in `s`.
#[inline]
#[must_use]
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
