// src/ingest/providers/site.rs
//! Page-scrape fragment source: anchors on an event-listing page.
//!
//! Each kept anchor becomes one fragment: the anchor text is the title
//! line, a window of surrounding page text is the context used for
//! date and location attribution.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{html_to_text, join_href};
use crate::dedup::canonicalize;
use crate::fetch::Fetcher;
use crate::ingest::types::{Fragment, FragmentSource, SourceKind};
use crate::normalize::normalize;

const MAX_ANCHORS: usize = 80;
const MIN_ANCHOR_CHARS: usize = 15;
/// Bytes of raw HTML around an anchor taken as its context block.
const CONTEXT_WINDOW: usize = 600;

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href\s*=\s*"([^"]+)"[^>]*>(.*?)</a>"#).expect("anchor regex")
});
static RE_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?src\s*=\s*"([^"]+)""#).expect("img regex")
});

pub struct SiteSource {
    name: String,
    url: String,
    fetcher: Arc<dyn Fetcher>,
}

impl SiteSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            fetcher,
        }
    }
}

fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[async_trait]
impl FragmentSource for SiteSource {
    async fn fetch_fragments(&self) -> Result<Vec<Fragment>> {
        let html = self.fetcher.fetch(&self.url).await;
        if html.is_empty() {
            return Ok(Vec::new());
        }

        let page_key = canonicalize(&self.url);
        let mut out = Vec::new();

        for caps in RE_ANCHOR.captures_iter(&html).take(MAX_ANCHORS) {
            let (Some(href_m), Some(inner_m), Some(whole)) =
                (caps.get(1), caps.get(2), caps.get(0))
            else {
                continue;
            };

            let title_raw = normalize(&html_to_text(inner_m.as_str())).replace('\n', " ");
            if title_raw.chars().count() < MIN_ANCHOR_CHARS {
                continue;
            }
            let Some(href) = join_href(&self.url, href_m.as_str()) else {
                continue;
            };
            // A link back to the listing page itself is navigation.
            if canonicalize(&href) == page_key {
                continue;
            }

            let win_start = floor_boundary(&html, whole.start().saturating_sub(CONTEXT_WINDOW));
            let win_end = ceil_boundary(&html, (whole.end() + CONTEXT_WINDOW).min(html.len()));
            let window = &html[win_start..win_end];
            let context = normalize(&html_to_text(window)).replace('\n', " ");

            let image_url = RE_IMG
                .captures(window)
                .and_then(|c| c.get(1))
                .and_then(|m| join_href(&self.url, m.as_str()));

            out.push(Fragment {
                text: format!("{title_raw}\n{context}"),
                link: Some(href),
                image_url,
                source_name: self.name.clone(),
                kind: SourceKind::Page,
            });
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
