//! English-only name filter

use std::ops::RangeInclusive;

/// Punctuation kept when reducing a name to its significant characters
pub const ALLOWED_PUNCTUATION: &[char] = &['-', '.', '\'', ',', '(', ')', '&'];

/// Unicode blocks whose presence anywhere in a name rejects it
pub const REJECTED_SCRIPT_RANGES: &[(&str, RangeInclusive<char>)] = &[
    ("Devanagari", '\u{0900}'..='\u{097F}'),
    ("CJK Unified Ideographs", '\u{4E00}'..='\u{9FFF}'),
    ("Arabic", '\u{0600}'..='\u{06FF}'),
    ("Cyrillic", '\u{0400}'..='\u{04FF}'),
];

/// Whether a character counts as part of a word (letters, digits, `_`)
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the rejected script a character belongs to, if any
pub fn rejected_script(c: char) -> Option<&'static str> {
    REJECTED_SCRIPT_RANGES
        .iter()
        .find(|(_, range)| range.contains(&c))
        .map(|(script, _)| *script)
}

/// Checks that a name is written in plain English
///
/// The name is first reduced to word characters, whitespace and
/// [`ALLOWED_PUNCTUATION`]. The reduced text must be non-empty and pure
/// ASCII, and the original text must not contain any character from
/// [`REJECTED_SCRIPT_RANGES`].
///
/// # Example
///
/// ```
/// use institution_crawler::is_english_only;
///
/// assert!(is_english_only("St. Mary's Academy (North)"));
/// assert!(!is_english_only("École Saint-Joseph"));
/// assert!(!is_english_only("!!!"));
/// ```
pub fn is_english_only(text: &str) -> bool {
    let reduced: String = text
        .chars()
        .filter(|&c| is_word_char(c) || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(&c))
        .collect();
    let reduced = reduced.trim();

    if reduced.is_empty() || !reduced.is_ascii() {
        return false;
    }

    !text.chars().any(|c| rejected_script(c).is_some())
}
