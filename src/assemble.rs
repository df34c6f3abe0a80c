// src/assemble.rs
//! Composition of the extraction pipeline: one Fragment in, zero or
//! more normalized Events out. Every failure mode here is "drop the
//! fragment", never "publish wrong data with confidence".

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::classify;
use crate::dates::{self, ParsedDate};
use crate::dedup::{self, DedupStore};
use crate::digest;
use crate::ingest::types::{Fragment, SourceKind};
use crate::normalize::normalize;
use crate::title;
use crate::vocab::Vocab;

/// The output record handed to the publisher. Immutable after emission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub title: String,
    pub date_display: String,
    pub location: String,
    pub venue: String,
    pub link: String,
    pub source: String,
    pub image_url: Option<String>,
}

/// State scoped to one pipeline run: title-prefix keys used to
/// collapse near-duplicates gathered from several sources. Discarded
/// at end of run, never persisted.
#[derive(Debug, Default)]
pub struct RunState {
    title_keys: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Short anonymized fragment id for diagnostics; raw text stays out of
/// the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Make a scraped link usable as an absolute URL, or reject it.
fn absolutize(link: &str) -> Option<String> {
    let l = link.trim();
    if l.starts_with("https://") || l.starts_with("http://") {
        return Some(l.to_string());
    }
    if l.starts_with("t.me/") || l.starts_with("www.") {
        return Some(format!("https://{l}"));
    }
    None
}

pub struct Assembler<'a> {
    vocab: &'a Vocab,
    today: NaiveDate,
}

impl<'a> Assembler<'a> {
    pub fn new(vocab: &'a Vocab, today: NaiveDate) -> Self {
        Self { vocab, today }
    }

    /// Run the full deterministic pipeline on one fragment.
    pub fn assemble(
        &self,
        frag: &Fragment,
        run: &mut RunState,
        store: &DedupStore,
    ) -> Vec<Event> {
        let text = normalize(&frag.text);
        if text.is_empty() {
            return Vec::new();
        }
        let id = anon_hash(&text);

        if frag.kind == SourceKind::Page && classify::is_site_trash(frag.title_line(), self.vocab)
        {
            debug!(%id, source = %frag.source_name, "dropped: site navigation");
            return Vec::new();
        }
        if !classify::is_event(&text, self.vocab) {
            debug!(%id, source = %frag.source_name, "dropped: not an event");
            return Vec::new();
        }

        if digest::looks_like_digest(&text) {
            let mut out = Vec::new();
            for draft in digest::split_digest(&text, frag.link.as_deref(), self.today) {
                let Some(title) = title::clean(&draft.title_raw, self.vocab) else {
                    continue;
                };
                if let Some(ev) = self.emit(
                    frag,
                    &text,
                    title,
                    &draft.date,
                    draft.link.as_deref(),
                    draft.venue.as_deref(),
                    run,
                    store,
                ) {
                    out.push(ev);
                }
            }
            return out;
        }

        let Some(date) = dates::resolve_event_date(&text, self.today) else {
            debug!(%id, source = %frag.source_name, "dropped: no future date");
            return Vec::new();
        };
        let Some(title) = title::clean(frag.title_line(), self.vocab) else {
            debug!(%id, source = %frag.source_name, "dropped: title did not survive cleaning");
            return Vec::new();
        };
        self.emit(
            frag,
            &text,
            title,
            &date,
            frag.link.as_deref(),
            None,
            run,
            store,
        )
        .into_iter()
        .collect()
    }

    /// Finish one event candidate with an externally supplied title
    /// (the optional cleanup collaborator). Date, classification and
    /// dedup rules still apply unchanged.
    pub fn assemble_with_title(
        &self,
        frag: &Fragment,
        title: String,
        run: &mut RunState,
        store: &DedupStore,
    ) -> Option<Event> {
        let text = normalize(&frag.text);
        if !classify::is_event(&text, self.vocab) {
            return None;
        }
        if title.chars().count() < 5 {
            return None;
        }
        let date = dates::resolve_event_date(&text, self.today)?;
        self.emit(frag, &text, title, &date, frag.link.as_deref(), None, run, store)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        frag: &Fragment,
        context: &str,
        title: String,
        date: &ParsedDate,
        link: Option<&str>,
        venue: Option<&str>,
        run: &mut RunState,
        store: &DedupStore,
    ) -> Option<Event> {
        let link = link.and_then(absolutize)?;
        let key = dedup::canonicalize(&link);
        if store.seen(&key) {
            debug!(key = %key, "dropped: already published");
            return None;
        }
        let tkey = dedup::title_key(&title);
        if !run.title_keys.insert(tkey) {
            debug!(id = %anon_hash(&title), "dropped: near-duplicate title this run");
            return None;
        }

        let location = self
            .vocab
            .location_anywhere(context)
            .unwrap_or("")
            .to_string();
        let venue = venue
            .map(str::to_string)
            .or_else(|| self.vocab.venue(context).map(str::to_string))
            .unwrap_or_default();

        Some(Event {
            title,
            date_display: dates::format_display(date),
            location,
            venue,
            link,
            source: frag.source_name.clone(),
            image_url: frag.image_url.clone(),
        })
    }
}
