//! Title extraction and reconciliation.
//!
//! A post's title follows its markdown: the text after the first `#` up to the
//! end of that line. When the heading disappears or is emptied the title falls
//! back to the title the post was loaded with, never to nothing, unless the
//! post had no title to begin with.

use std::sync::LazyLock;

use regex_lite::Regex;

/// First `#` and the rest of its line. U+2028 and U+2029 end a line too.
static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([^\r\n\x{2028}\x{2029}]*)").unwrap());

/// The text after the first `#` in `markdown`, verbatim, up to the line end.
///
/// `Some("")` means a marker with nothing after it; `None` means no marker.
pub fn extract_heading(markdown: &str) -> Option<&str> {
    HEADING_REGEX
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Derive the title for `markdown`.
///
/// | heading | original title | result |
/// |---|---|---|
/// | non-empty | any | heading |
/// | empty or absent | non-empty | original |
/// | empty or absent | absent or empty | `None` |
pub fn reconcile(markdown: &str, original_title: Option<&str>) -> Option<String> {
    match extract_heading(markdown) {
        Some(candidate) if !candidate.is_empty() => Some(candidate.to_owned()),
        _ => original_title
            .filter(|title| !title.is_empty())
            .map(str::to_owned),
    }
}
