// src/title.rs
//! Deterministic title cleanup.
//!
//! Scraped anchor text and channel lines carry date prefixes, glued
//! city tokens, self-duplicated phrases and description bleed-over.
//! `clean` is idempotent: the pipeline reapplies it defensively on the
//! digest and non-digest paths and the result must not change.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dates;
use crate::normalize::normalize;
use crate::vocab::Vocab;

const MIN_TITLE_CHARS: usize = 5;
const MAX_TITLE_CHARS: usize = 120;

/// Marker phrases past which a "title" is actually its own description.
static DESCRIPTION_MARKERS: &[&str] = &[
    "приглашаем",
    "регистрация по ссылке",
    "регистрируйтесь",
    "подробности",
    "подробнее",
    "узнать больше",
    "читать далее",
    "в программе",
    "вы узнаете",
    "ждем вас",
    "ждём вас",
    "расскажем",
    "обсудим",
    "успейте",
];

static RE_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:кажд(?:ую|ый|ое)\s+)?(?:(?:в|во)\s+)?(?:понедельник|вторник|сред[ау]|четверг|пятниц[ау]|суббот[ау]|воскресень[ея])\b[.,]?\s*",
    )
    .expect("weekday regex")
});

static RE_QUOTED_DUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(?s)(.{5,}?)\\s*[«\"](.+?)[»\"]").expect("quoted dup regex")
});

fn trim_frag(s: &str) -> String {
    s.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?' | ':' | ';' | '-' | '–' | '—' | '«' | '»' | '"' | '\'')
    })
    .to_lowercase()
}

/// Insert one space at the first glued case-transition boundary:
/// lowercase followed by uppercase, or a Cyrillic/Latin script switch
/// between letters.
fn split_glued(s: &str) -> Option<String> {
    let is_cyr = |c: char| ('\u{0400}'..='\u{04FF}').contains(&c);
    let chars: Vec<char> = s.chars().collect();
    for i in 0..chars.len().saturating_sub(1) {
        let (a, b) = (chars[i], chars[i + 1]);
        if !a.is_alphabetic() || !b.is_alphabetic() {
            continue;
        }
        let case_turn = a.is_lowercase() && b.is_uppercase();
        let script_turn = is_cyr(a) != is_cyr(b);
        if case_turn || script_turn {
            let mut out: String = chars[..=i].iter().collect();
            out.push(' ');
            out.extend(&chars[i + 1..]);
            return Some(out);
        }
    }
    None
}

fn strip_city_prefix(s: &str, vocab: &Vocab) -> String {
    let mut rest = s.trim_start().to_string();
    loop {
        if let Some((nchars, _)) = vocab.location_prefix(&rest) {
            let stripped: String = rest.chars().skip(nchars).collect();
            rest = stripped
                .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | '–' | '—' | ':' | '·'))
                .to_string();
            continue;
        }
        // Glued city: "ОнлайнВнедрение AI" → split once and retry, but
        // only keep the split when it actually exposes a city prefix.
        if let Some(split) = split_glued(&rest) {
            if vocab.location_prefix(&split).is_some() {
                rest = split;
                continue;
            }
        }
        return rest;
    }
}

/// Collapse "TitleTitle" / "Title Title" self-duplication: if the
/// first part, ignoring surrounding punctuation, equals everything
/// that follows it, keep only the first part.
fn collapse_half_dup(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    for mid in 4..n {
        let first: String = chars[..mid].iter().collect();
        let second: String = chars[mid..].iter().collect();
        if trim_frag(&first) == trim_frag(&second) && !trim_frag(&first).is_empty() {
            return first.trim().to_string();
        }
    }
    s.to_string()
}

/// The second duplication shape: the phrase reappears inside matched
/// quotes right after itself. Keep the text preceding the quote.
fn collapse_quoted_dup(s: &str) -> String {
    if let Some(caps) = RE_QUOTED_DUP.captures(s) {
        let pre = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let quoted = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if !pre.is_empty() && trim_frag(pre) == trim_frag(quoted) {
            return pre.trim().to_string();
        }
    }
    s.to_string()
}

/// Char index of the first description marker, if any.
fn marker_position(s: &str) -> Option<usize> {
    let lower = s.to_lowercase();
    DESCRIPTION_MARKERS
        .iter()
        .filter_map(|m| lower.find(m))
        .min()
        .map(|byte_pos| lower[..byte_pos].chars().count())
}

/// Clean a raw title candidate. Returns `None` when nothing title-like
/// survives; the caller drops the fragment.
pub fn clean(raw: &str, vocab: &Vocab) -> Option<String> {
    let mut s = normalize(raw);

    // 1-3. leading date/time, weekday phrase, city token (glued form
    // included). These stack in any order, so strip to a fixpoint.
    loop {
        let before = s.clone();
        s = dates::strip_leading_date_time(&s).to_string();
        loop {
            let replaced = RE_WEEKDAY.replace(&s, "").to_string();
            if replaced.len() == s.len() {
                break;
            }
            s = replaced.trim_start().to_string();
        }
        s = strip_city_prefix(&s, vocab);
        if s == before {
            break;
        }
    }

    // 4. self-duplication
    s = collapse_quoted_dup(&s);
    s = collapse_half_dup(&s);

    // 5. description bleed-over: truncate at a late marker, reject an
    //    early one outright
    if let Some(pos) = marker_position(&s) {
        if pos > 12 {
            s = s.chars().take(pos).collect::<String>().trim().to_string();
            s = s
                .trim_end_matches(|c: char| matches!(c, ',' | '.' | '-' | '–' | '—' | ':' | ';' | '!'))
                .trim_end()
                .to_string();
        } else {
            return None;
        }
    }

    if s.chars().count() > MAX_TITLE_CHARS {
        s = s.chars().take(MAX_TITLE_CHARS).collect::<String>().trim_end().to_string();
    }
    s = s.trim().to_string();

    // 6. reject residue
    if s.chars().count() < MIN_TITLE_CHARS {
        return None;
    }
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab;

    fn v() -> crate::vocab::Vocab {
        vocab::fixture()
    }

    #[test]
    fn strips_date_time_and_glued_city() {
        let out = clean("24 Фев, 16:00Онлайн Внедрение AI в бизнес", &v()).unwrap();
        assert_eq!(out, "Внедрение AI в бизнес");
    }

    #[test]
    fn strips_truly_glued_city_via_case_boundary() {
        let out = clean("ОнлайнВнедрение AI в бизнес", &v()).unwrap();
        assert_eq!(out, "Внедрение AI в бизнес");
    }

    #[test]
    fn strips_weekday_phrase() {
        let out = clean("Каждую среду Разговорный клуб английского", &v()).unwrap();
        assert_eq!(out, "Разговорный клуб английского");
    }

    #[test]
    fn collapses_self_duplication() {
        let out = clean("Data Community BirthdayData Community Birthday", &v()).unwrap();
        assert_eq!(out, "Data Community Birthday");
    }

    #[test]
    fn collapses_quoted_duplication() {
        let out = clean("Лекция о космосе «Лекция о космосе» 18+", &v()).unwrap();
        assert_eq!(out, "Лекция о космосе");
    }

    #[test]
    fn truncates_late_description_marker() {
        let out = clean("Митап по Rust в Алматы. Приглашаем всех желающих", &v()).unwrap();
        assert_eq!(out, "Митап по Rust в Алматы");
    }

    #[test]
    fn rejects_early_description_marker() {
        assert!(clean("Приглашаем всех на наше мероприятие", &v()).is_none());
    }

    #[test]
    fn rejects_short_titles_regardless_of_input_length() {
        assert!(clean("24 Фев, 16:00 Онлайн ML", &v()).is_none());
        assert!(clean("ab", &v()).is_none());
    }

    #[test]
    fn idempotent_on_valid_output() {
        let inputs = [
            "24 Фев, 16:00Онлайн Внедрение AI в бизнес",
            "Data Community BirthdayData Community Birthday",
            "Каждую среду Разговорный клуб английского",
            "Митап по Rust в Алматы. Приглашаем всех желающих",
            "Просто нормальный заголовок",
        ];
        for raw in inputs {
            let once = clean(raw, &v()).unwrap();
            let twice = clean(&once, &v()).unwrap();
            assert_eq!(once, twice, "clean must be idempotent for {raw:?}");
        }
    }
}
