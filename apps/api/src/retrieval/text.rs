//! Text normalization and crude keyword extraction.
//!
//! `extract_keywords` is deliberately coarse: lowercased, deduplicated tokens longer
//! than two characters. A smarter extractor can replace it as long as it keeps the
//! contract (ordered, deduplicated, length-bounded).

/// Characters kept by `extract_keywords` besides ASCII alphanumerics and space.
const KEYWORD_PUNCTUATION: &[char] = &['+', '/', '#', '&', '.', ',', '-'];

/// Collapses every run of whitespace (non-breaking spaces included) to a single
/// ASCII space and trims both ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase whitespace tokenization shared by the lexical index and its queries.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .to_lowercase()
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts up to `limit` keywords from free text, first-seen order preserved.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ' ' || KEYWORD_PUNCTUATION.contains(&c) {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .filter(|t| seen.insert(*t))
        .take(limit)
        .map(str::to_string)
        .collect()
}
