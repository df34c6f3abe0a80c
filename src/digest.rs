// src/digest.rs
//! Splitting of composite "digest" announcements.
//!
//! Channels often post one message listing several events, one
//! date-prefixed line each. Every matching line becomes an independent
//! draft; a malformed line never aborts the scan of the lines after it.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dates::{self, ParsedDate};

/// One event candidate carved out of a digest line. The assembler
/// still runs the title cleaner and dedup checks on it.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title_raw: String,
    pub date: ParsedDate,
    pub link: Option<String>,
    pub venue: Option<String>,
}

static RE_DIGEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d{1,2}\.\d{2}\b.*\d{1,2}:\d{2}").expect("digest line regex")
});
static RE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://\S+|\bt\.me/\S+|\bwww\.\S+)").expect("url regex")
});
static RE_VENUE_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@\s*([\p{L}\d][\p{L}\d .&'-]{1,39})").expect("venue-at regex")
});

/// Digest trigger: at least one "D.MM … HH:MM"-shaped line.
pub fn looks_like_digest(text: &str) -> bool {
    RE_DIGEST_LINE.is_match(text)
}

fn strip_urls(s: &str) -> String {
    RE_URL.replace_all(s, "").trim().to_string()
}

fn find_url(lines: &[&str], from: usize) -> Option<String> {
    // Current line plus up to 3 following lines.
    for line in lines.iter().skip(from).take(4) {
        if let Some(m) = RE_URL.find(line) {
            return Some(m.as_str().trim_end_matches([',', '.', ')']).to_string());
        }
    }
    None
}

fn find_venue(lines: &[&str], from: usize) -> Option<String> {
    let scope = lines
        .iter()
        .skip(from)
        .take(2)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    RE_VENUE_AT
        .captures(&scope)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
}

/// Scan `text` line by line and emit one draft per date-prefixed line.
/// Lines that fail date resolution (including the future-only policy)
/// or produce too-short titles are silently dropped.
pub fn split_digest(text: &str, fallback_link: Option<&str>, today: NaiveDate) -> Vec<EventDraft> {
    let lines: Vec<&str> = text.lines().collect();
    let mut drafts = Vec::new();

    for (i, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || !dates::starts_with_date(line) {
            continue;
        }
        let Some(date) = dates::resolve(line, today) else {
            continue;
        };
        if !date.is_future(today) {
            continue;
        }

        let mut title_raw = strip_urls(dates::strip_leading_date_time(line));
        if title_raw.chars().count() < 5 {
            // Date sits alone on its line; the title is the next
            // non-empty line.
            title_raw = lines
                .iter()
                .skip(i + 1)
                .map(|l| strip_urls(l.trim()))
                .find(|l| !l.is_empty())
                .unwrap_or_default();
        }
        if title_raw.chars().count() < 5 {
            continue;
        }

        let link = find_url(&lines, i).or_else(|| fallback_link.map(str::to_string));
        let venue = find_venue(&lines, i);

        drafts.push(EventDraft {
            title_raw,
            date,
            link,
            venue,
        });
    }
    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    #[test]
    fn detects_digest_shape() {
        assert!(looks_like_digest("12.02 в 10:00 Конференция X"));
        assert!(!looks_like_digest("Обычный анонс без дат"));
        assert!(!looks_like_digest("12.02 без времени"));
    }

    #[test]
    fn two_lines_two_drafts_with_their_own_links() {
        let text = "Афиша недели:\n12.02 в 10:00 Конференция X t.me/abc\n15.02 в 18:00 Хакатон Y t.me/def";
        let drafts = split_digest(text, None, today());
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title_raw, "Конференция X");
        assert_eq!(drafts[0].link.as_deref(), Some("t.me/abc"));
        assert_eq!((drafts[0].date.day, drafts[0].date.month), (12, 2));
        assert_eq!(drafts[1].link.as_deref(), Some("t.me/def"));
        assert!(drafts[1].date.is_future(today()));
    }

    #[test]
    fn borrows_next_line_as_title_when_date_stands_alone() {
        let text = "20.02 в 19:00\nБольшой митап дата-инженеров\nt.me/xyz";
        let drafts = split_digest(text, None, today());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title_raw, "Большой митап дата-инженеров");
        assert_eq!(drafts[0].link.as_deref(), Some("t.me/xyz"));
    }

    #[test]
    fn malformed_line_does_not_abort_scan() {
        let text = "31.02 в 10:00 Несуществующая дата\n15.02 в 18:00 Хакатон Y";
        let drafts = split_digest(text, Some("https://t.me/chan/1"), today());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title_raw, "Хакатон Y");
        // No URL in the text → fragment link is borrowed.
        assert_eq!(drafts[0].link.as_deref(), Some("https://t.me/chan/1"));
    }

    #[test]
    fn past_lines_are_dropped_by_future_only_policy() {
        let text = "10.01 в 19:00 Прошедшее событие\n15.02 в 18:00 Будущее событие";
        let drafts = split_digest(text, None, today());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title_raw, "Будущее событие");
    }

    #[test]
    fn venue_is_scoped_to_current_and_next_line() {
        let text = "14.02 в 20:00 Концерт джаза\n@ MOST Hub";
        let drafts = split_digest(text, None, today());
        assert_eq!(drafts[0].venue.as_deref(), Some("MOST Hub"));
    }
}
