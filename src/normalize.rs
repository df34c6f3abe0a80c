// src/normalize.rs
//! Text normalization applied before any other heuristic.
//!
//! Announcement text arrives decorated with pictographs and with time
//! tokens glued straight onto the next word ("16:00Онлайн"). Every
//! downstream matcher assumes this module already ran.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TIME_THEN_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}:\d{2})(\p{L})").expect("time-letter regex"));
static RE_LETTER_THEN_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})(\d{1,2}:\d{2})").expect("letter-time regex"));
static RE_SPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]{2,}").expect("space run regex"));
static RE_NEWLINE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]*\n\s*").expect("newline run regex"));

/// True for decorative/pictographic codepoints we strip outright.
/// Letters of the target alphabets (Cyrillic, Latin) are never here.
fn is_decorative(c: char) -> bool {
    matches!(c,
        '\u{1F000}'..='\u{1FAFF}'   // pictographs, emoji, symbols-extended
        | '\u{2600}'..='\u{27BF}'   // misc symbols + dingbats
        | '\u{2B00}'..='\u{2BFF}'   // arrows, stars
        | '\u{FE00}'..='\u{FE0F}'   // variation selectors
        | '\u{200D}'                // zero-width joiner
        | '\u{20E3}'                // combining keycap
    )
}

/// Strip decorative symbols, split glued time tokens, collapse whitespace.
/// Pure and total: never fails on valid UTF-8.
pub fn normalize(text: &str) -> String {
    let mut out: String = text
        .chars()
        .map(|c| if is_decorative(c) { ' ' } else { c })
        .collect();

    // A time token fused against a word on either side gets a separator.
    out = RE_TIME_THEN_LETTER.replace_all(&out, "$1 $2").to_string();
    out = RE_LETTER_THEN_TIME.replace_all(&out, "$1 $2").to_string();

    // Collapse whitespace runs to one separator. Newlines survive as a
    // single newline: digest splitting depends on line structure.
    out = RE_SPACE_RUN.replace_all(&out, " ").to_string();
    out = RE_NEWLINE_RUN.replace_all(&out, "\n").to_string();
    out.trim().to_string()
}
