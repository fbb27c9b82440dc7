//! JD cleanup: normalizes pasted job descriptions before retrieval.

use std::sync::LazyLock;

use regex::Regex;

use crate::retrieval::text::normalize;

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?i)(responsibilities|requirements|qualifications)") {
        Ok(regex) => regex,
        Err(err) => panic!("JD section regex is invalid: {err}"),
    }
});

/// Collapses whitespace and sets the common section headings on their own lines,
/// keeping the original spelling.
pub fn clean_jd_text(raw: &str) -> String {
    let text = normalize(raw);
    if text.is_empty() {
        return text;
    }
    SECTION_HEADING
        .replace_all(&text, "\n\n**$1**\n")
        .trim()
        .to_string()
}
