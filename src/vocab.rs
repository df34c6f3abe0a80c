// src/vocab.rs
//! Table-driven matchers over the fixed city/venue/keyword vocabulary.
//!
//! Tables are immutable, built once and injected into the pipeline
//! instead of living as ambient globals, so tests can substitute small
//! fixture tables. City aliases span two scripts and all map to one
//! canonical spelling.

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Vocab {
    /// alias (lowercased) → canonical, sorted longest alias first.
    cities: Vec<(String, String)>,
    venues: Vec<(String, String)>,
    event_keywords: Vec<String>,
    block_keywords: Vec<String>,
    trash_keywords: Vec<String>,
}

impl Vocab {
    pub fn new(
        cities: &[(&str, &str)],
        venues: &[(&str, &str)],
        event_keywords: &[&str],
        block_keywords: &[&str],
        trash_keywords: &[&str],
    ) -> Self {
        let mut cities: Vec<(String, String)> = cities
            .iter()
            .map(|(a, c)| (a.to_lowercase(), c.to_string()))
            .collect();
        cities.sort_by_key(|(a, _)| std::cmp::Reverse(a.chars().count()));
        let mut venues: Vec<(String, String)> = venues
            .iter()
            .map(|(a, c)| (a.to_lowercase(), c.to_string()))
            .collect();
        venues.sort_by_key(|(a, _)| std::cmp::Reverse(a.chars().count()));
        Self {
            cities,
            venues,
            event_keywords: event_keywords.iter().map(|s| s.to_lowercase()).collect(),
            block_keywords: block_keywords.iter().map(|s| s.to_lowercase()).collect(),
            trash_keywords: trash_keywords.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn builtin() -> &'static Vocab {
        &BUILTIN
    }

    /// Canonical city for an alias occurring anywhere in `text`
    /// (attribution over a larger context).
    pub fn location_anywhere(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.cities
            .iter()
            .find(|(alias, _)| lower.contains(alias.as_str()))
            .map(|(_, canon)| canon.as_str())
    }

    /// City alias at the *start* of a title (for stripping). Returns
    /// the number of chars the alias occupies in the title plus the
    /// canonical name. The alias must end at a word boundary.
    pub fn location_prefix<'a>(&'a self, title: &str) -> Option<(usize, &'a str)> {
        let lower = title.to_lowercase();
        for (alias, canon) in &self.cities {
            if !lower.starts_with(alias.as_str()) {
                continue;
            }
            let nchars = alias.chars().count();
            let boundary_ok = match title.chars().nth(nchars) {
                None => true,
                Some(c) => !c.is_alphanumeric(),
            };
            if boundary_ok {
                return Some((nchars, canon.as_str()));
            }
        }
        None
    }

    /// Canonical venue label for an alias occurring anywhere in `text`.
    pub fn venue(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.venues
            .iter()
            .find(|(alias, _)| lower.contains(alias.as_str()))
            .map(|(_, canon)| canon.as_str())
    }

    pub fn has_event_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.event_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn has_block_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.block_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn has_trash_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.trash_keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

static BUILTIN: Lazy<Vocab> = Lazy::new(|| {
    Vocab::new(CITIES, VENUES, EVENT_KEYWORDS, BLOCK_KEYWORDS, TRASH_KEYWORDS)
});

const CITIES: &[(&str, &str)] = &[
    ("алматы", "Алматы"),
    ("алмате", "Алматы"),
    ("алма-ата", "Алматы"),
    ("almaty", "Алматы"),
    ("астана", "Астана"),
    ("астане", "Астана"),
    ("нур-султан", "Астана"),
    ("astana", "Астана"),
    ("шымкент", "Шымкент"),
    ("shymkent", "Шымкент"),
    ("караганда", "Караганда"),
    ("караганде", "Караганда"),
    ("karaganda", "Караганда"),
    ("бишкек", "Бишкек"),
    ("bishkek", "Бишкек"),
    ("ташкент", "Ташкент"),
    ("tashkent", "Ташкент"),
    ("онлайн", "Онлайн"),
    ("online", "Онлайн"),
];

const VENUES: &[(&str, &str)] = &[
    ("astana hub", "Astana Hub"),
    ("most hub", "MOST Hub"),
    ("smart.point", "SmArt.Point"),
    ("smartpoint", "SmArt.Point"),
    ("transforma", "Transforma"),
    ("dom 36", "Dom 36"),
    ("forte forum", "Forte Forum"),
    ("il dom", "IL Dom"),
];

const EVENT_KEYWORDS: &[&str] = &[
    "конференц",
    "митап",
    "meetup",
    "хакатон",
    "hackathon",
    "воркшоп",
    "workshop",
    "лекци",
    "семинар",
    "вебинар",
    "мастер-класс",
    "нетворкинг",
    "networking",
    "форум",
    "демо-день",
    "demo day",
    "фестивал",
    "выставк",
    "презентаци",
    "интенсив",
    "стартап-уикенд",
    "питч",
    "pitch",
    "тренинг",
];

const BLOCK_KEYWORDS: &[&str] = &[
    // finance tickers / exchange-rate news
    "курс доллара",
    "курс евро",
    "курс тенге",
    "курс рубля",
    "нацбанк",
    "инфляци",
    // government / bureaucracy
    "акимат",
    "госуслуг",
    "постановлени",
    "министерств",
    "налогов",
    "штраф",
    // programming-course marketing
    "научитесь программировать",
    "станьте программистом",
    "обучение с нуля",
    "гарантией трудоустройства",
    "курсы со скидкой",
    // traditional trade skills
    "парикмахер",
    "маникюр",
    "сварщик",
    "швея",
    "кройки и шитья",
    "массаж",
];

const TRASH_KEYWORDS: &[&str] = &[
    "контакты",
    "о нас",
    "о проекте",
    "политика конфиденциальности",
    "пользовательское соглашение",
    "карта сайта",
    "личный кабинет",
    "войти",
    "вход",
    "подписаться на рассылку",
    "реклама на сайте",
    "вакансии",
    "главная",
    "все события",
    "показать еще",
    "показать ещё",
    "читать далее",
    "подробнее",
    "privacy policy",
    "terms of service",
    "cookie",
    "login",
    "sign in",
    "contact us",
    "about us",
];

#[cfg(test)]
pub(crate) fn fixture() -> Vocab {
    Vocab::new(
        &[("алматы", "Алматы"), ("онлайн", "Онлайн"), ("online", "Онлайн")],
        &[("most hub", "MOST Hub")],
        &["митап", "конференц", "хакатон"],
        &["курс доллара", "акимат"],
        &["контакты", "о нас"],
    )
}
