//! Slug helpers for category lookup keys.

/// Derives a URL-safe slug from a display name.
///
/// Non-ASCII letters are transliterated (`í` becomes `i`), remaining
/// punctuation is dropped, the result is lowercased, and runs of whitespace
/// or hyphens collapse to a single `-`.
/// Leading and trailing `-`/`_` are trimmed.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in deunicode::deunicode(name).chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch.is_whitespace() {
            pending_dash = true;
        }
    }

    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// A slug is non-empty and made only of ASCII letters, digits, `_` and `-`.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
