// src/dates.rs
//! Date/time extraction with a strict future-only year policy.
//!
//! Four pattern families are tried in priority order: day-range with a
//! full month name, "D Month", "D Mon" (3-letter abbreviation), and
//! numeric "D.MM". An explicit 4-digit year is always taken as-is; a
//! missing year defaults to the current year and the result is
//! discarded when that puts the date on or before today. Rolling a
//! dateless year forward is exactly the bug this policy exists to
//! prevent.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// One extracted calendar date, plus an optional "HH:MM" clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub time: Option<String>,
}

impl ParsedDate {
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.to_naive().map(|d| d > today).unwrap_or(false)
    }
}

const MONTH_FULL: &str = "январ[ья]|феврал[ья]|марта?|апрел[ья]|ма[йя]|июн[ья]|июл[ья]|августа?|сентябр[ья]|октябр[ья]|ноябр[ья]|декабр[ья]";
const MONTH_ABBR: &str = "янв|фев|мар|апр|ма[йя]|июн|июл|авг|сен|окт|ноя|дек";

static RE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s*[–—-]\s*(\d{{1,2}})\s+({MONTH_FULL})\b(?:\s+(\d{{4}}))?"
    ))
    .expect("range date regex")
});
static RE_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+({MONTH_FULL})\b(?:\s+(\d{{4}}))?"
    ))
    .expect("full-month date regex")
});
static RE_ABBR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+({MONTH_ABBR})\b\.?(?:\s+(\d{{4}}))?"
    ))
    .expect("abbrev-month date regex")
});
static RE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{2})(?:\.(\d{4}))?\b").expect("numeric date regex"));

static RE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("time regex"));

/// Only accept clock hours that plausibly start an event. A fragment
/// usually also carries a "23:59" deadline time; that one never wins.
const EVENT_HOURS: std::ops::RangeInclusive<u32> = 7..=22;

/// How far back (in bytes) a deadline marker may sit before a date
/// expression and still claim it.
const DEADLINE_WINDOW: usize = 80;

static DEADLINE_MARKERS: &[&str] = &[
    "дедлайн",
    "deadline",
    "подать заявку до",
    "заявки до",
    "заявки принимаются до",
    "регистрация до",
    "регистрация закрывается",
    "прием заявок до",
    "приём заявок до",
    "успейте до",
    "apply by",
    "registration closes",
];

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    // "мар" must be checked before the bare "ма" of май/мая.
    const PREFIXES: &[(&str, u32)] = &[
        ("янв", 1),
        ("фев", 2),
        ("мар", 3),
        ("апр", 4),
        ("ма", 5),
        ("июн", 6),
        ("июл", 7),
        ("авг", 8),
        ("сен", 9),
        ("окт", 10),
        ("ноя", 11),
        ("дек", 12),
    ];
    PREFIXES
        .iter()
        .find(|(p, _)| lower.starts_with(p))
        .map(|(_, m)| *m)
}

#[derive(Debug, Clone, Copy)]
struct RawMatch {
    start: usize,
    day: u32,
    month: u32,
    year: Option<i32>,
}

fn capture_to_raw(caps: &regex::Captures<'_>, day_group: usize, month_is_name: bool) -> Option<RawMatch> {
    let day: u32 = caps.get(day_group)?.as_str().parse().ok()?;
    let month = if month_is_name {
        month_from_name(caps.get(day_group + 1)?.as_str())?
    } else {
        caps.get(day_group + 1)?.as_str().parse().ok()?
    };
    let year = caps
        .get(day_group + 2)
        .and_then(|m| m.as_str().parse::<i32>().ok());
    Some(RawMatch {
        start: caps.get(0)?.start(),
        day,
        month,
        year,
    })
}

fn family_matches(text: &str) -> Vec<RawMatch> {
    let mut out = Vec::new();
    for caps in RE_RANGE.captures_iter(text) {
        // The second day of the range anchors the date.
        if let Some(raw) = capture_to_raw(&caps, 2, true) {
            out.push(raw);
        }
    }
    for caps in RE_FULL.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, true) {
            out.push(raw);
        }
    }
    for caps in RE_ABBR.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, true) {
            out.push(raw);
        }
    }
    for caps in RE_NUMERIC.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, false) {
            out.push(raw);
        }
    }
    out
}

fn first_match(text: &str) -> Option<RawMatch> {
    for caps in RE_RANGE.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 2, true) {
            return Some(raw);
        }
    }
    for caps in RE_FULL.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, true) {
            return Some(raw);
        }
    }
    for caps in RE_ABBR.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, true) {
            return Some(raw);
        }
    }
    for caps in RE_NUMERIC.captures_iter(text) {
        if let Some(raw) = capture_to_raw(&caps, 1, false) {
            return Some(raw);
        }
    }
    None
}

/// Apply the year policy and calendar validation to one raw match.
/// Explicit years pass through even when in the past; the caller
/// filters future-ness separately. A defaulted current year that lands
/// on or before `today` fails closed.
fn finish(raw: RawMatch, today: NaiveDate) -> Option<ParsedDate> {
    let (year, defaulted) = match raw.year {
        Some(y) => (y, false),
        None => (today.year(), true),
    };
    let date = NaiveDate::from_ymd_opt(year, raw.month, raw.day)?;
    if defaulted && date <= today {
        return None;
    }
    Some(ParsedDate {
        day: raw.day,
        month: raw.month,
        year,
        time: None,
    })
}

/// Extract the first date expression from `text`.
pub fn resolve(text: &str, today: NaiveDate) -> Option<ParsedDate> {
    let mut parsed = finish(first_match(text)?, today)?;
    parsed.time = extract_time(text);
    Some(parsed)
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn is_deadline_marked(text: &str, match_start: usize) -> bool {
    let win_start = floor_char_boundary(text, match_start.saturating_sub(DEADLINE_WINDOW));
    let window = text[win_start..match_start].to_lowercase();
    DEADLINE_MARKERS.iter().any(|m| window.contains(m))
}

/// Extract the date of the event itself, not of an application
/// deadline mentioned alongside it. Candidates preceded by a deadline
/// marker are discarded; of the remaining future dates the latest one
/// wins. If every future date is deadline-marked the fragment yields
/// nothing.
pub fn resolve_event_date(text: &str, today: NaiveDate) -> Option<ParsedDate> {
    let mut best: Option<ParsedDate> = None;
    for raw in family_matches(text) {
        if is_deadline_marked(text, raw.start) {
            continue;
        }
        let Some(parsed) = finish(raw, today) else {
            continue;
        };
        if !parsed.is_future(today) {
            continue;
        }
        let better = match &best {
            None => true,
            Some(b) => parsed.to_naive() > b.to_naive(),
        };
        if better {
            best = Some(parsed);
        }
    }
    let mut parsed = best?;
    parsed.time = extract_time(text);
    Some(parsed)
}

/// Independent clock-time extraction. The plausible-hours window only
/// disambiguates: when several times are present the first in-window
/// one wins (a fragment usually also carries a "23:59" deadline). A
/// lone time is kept even outside the window, unless a deadline marker
/// claims it.
pub fn extract_time(text: &str) -> Option<String> {
    let mut found: Vec<(usize, String, u32)> = Vec::new();
    for caps in RE_TIME.captures_iter(text) {
        let (Some(whole), Some(h), Some(m)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(hour) = h.as_str().parse::<u32>() else {
            continue;
        };
        found.push((whole.start(), format!("{}:{}", h.as_str(), m.as_str()), hour));
    }
    if let Some((_, t, _)) = found.iter().find(|(_, _, h)| EVENT_HOURS.contains(h)) {
        return Some(t.clone());
    }
    match found.as_slice() {
        [(start, t, _)] if !is_deadline_marked(text, *start) => Some(t.clone()),
        _ => None,
    }
}

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// Render "24 февраля 2026" (plus ", 16:00" when a time is known).
pub fn format_display(d: &ParsedDate) -> String {
    let month = MONTHS_GENITIVE
        .get(d.month as usize - 1)
        .copied()
        .unwrap_or("");
    match &d.time {
        Some(t) => format!("{} {} {}, {}", d.day, month, d.year, t),
        None => format!("{} {} {}", d.day, month, d.year),
    }
}

// --- leading-expression stripping (shared with the title cleaner) ---

static RE_LEAD_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?:(?:\d{{1,2}}\s*[–—-]\s*)?\d{{1,2}}\s+(?:{MONTH_FULL}|{MONTH_ABBR})\b\.?(?:\s+\d{{4}})?|\d{{1,2}}\.\d{{2}}(?:\.\d{{4}})?)"
    ))
    .expect("leading date regex")
});
static RE_LEAD_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:в\s+)?(?:[01]?\d|2[0-3]):[0-5]\d").expect("leading time regex")
});

fn strip_lead_separators(s: &str) -> &str {
    s.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | '–' | '—' | '·' | '|' | ':' | ';'))
}

/// True when `s` opens with a date expression of any family.
pub fn starts_with_date(s: &str) -> bool {
    RE_LEAD_DATE.is_match(s.trim_start())
}

/// Strip a leading date and/or time expression plus the separators
/// around it. Returns the remaining slice of `s`.
pub fn strip_leading_date_time(s: &str) -> &str {
    let mut rest = s.trim_start();
    loop {
        let before = rest;
        if let Some(m) = RE_LEAD_DATE.find(rest) {
            rest = strip_lead_separators(&rest[m.end()..]);
        }
        if let Some(m) = RE_LEAD_TIME.find(rest) {
            rest = strip_lead_separators(&rest[m.end()..]);
        }
        if rest.len() == before.len() {
            return rest;
        }
    }
}
