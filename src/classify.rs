// src/classify.rs
//! Event-likeness classification: allow-list AND NOT block-list.
//!
//! The block-list carries the negative classes that historically
//! caused the worst false positives against "training"/"course"-style
//! allow keywords: exchange-rate and bureaucracy news, programming
//! course marketing, traditional trade-skill ads.

use crate::vocab::Vocab;

/// True iff at least one event keyword is present and no block keyword
/// is. Block keywords always win.
pub fn is_event(text: &str, vocab: &Vocab) -> bool {
    vocab.has_event_keyword(text) && !vocab.has_block_keyword(text)
}

/// Cheap short-circuit for page-scraped fragments: site navigation and
/// boilerplate phrases, applied before `is_event`.
pub fn is_site_trash(title: &str, vocab: &Vocab) -> bool {
    vocab.has_trash_keyword(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocab;

    #[test]
    fn allow_keyword_required() {
        let v = Vocab::builtin();
        assert!(is_event("Конференция по данным в Алматы", v));
        // No allow keyword at all → not an event, even with no blocker.
        assert!(!is_event("Курс валют на сегодня", v));
    }

    #[test]
    fn block_keyword_wins_over_allow() {
        let v = Vocab::builtin();
        assert!(!is_event("Семинар акимата по налогам", v));
        assert!(!is_event("Тренинг: станьте программистом с нуля", v));
        assert!(!is_event("Мастер-класс по маникюру", v));
    }

    #[test]
    fn site_navigation_is_trash() {
        let v = Vocab::builtin();
        assert!(is_site_trash("Контакты", v));
        assert!(is_site_trash("Политика конфиденциальности", v));
        assert!(is_site_trash("Privacy Policy", v));
        assert!(!is_site_trash("Митап по Rust", v));
    }
}
