// src/ingest/providers/channel.rs
//! Channel-preview fragment source.
//!
//! Public channels expose a preview page with one block per message.
//! Each block yields one fragment: the message text with line
//! structure preserved, the canonical post link, and the preview
//! photo when present.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::html_to_text;
use crate::fetch::Fetcher;
use crate::ingest::types::{Fragment, FragmentSource, SourceKind};
use crate::normalize::normalize;

const MESSAGE_BLOCK_MARKER: &str = "tgme_widget_message_wrap";
const MIN_MESSAGE_CHARS: usize = 15;

static RE_MSG_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)class="tgme_widget_message_text[^"]*"[^>]*>(.*?)</div>"#)
        .expect("message text regex")
});
static RE_DATA_POST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-post="([^"]+)""#).expect("data-post regex"));
static RE_PHOTO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background-image:url\('([^']+)'\)"#).expect("photo regex")
});

pub struct ChannelSource {
    name: String,
    url: String,
    fetcher: Arc<dyn Fetcher>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl FragmentSource for ChannelSource {
    async fn fetch_fragments(&self) -> Result<Vec<Fragment>> {
        let html = self.fetcher.fetch(&self.url).await;
        if html.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for block in html.split(MESSAGE_BLOCK_MARKER).skip(1) {
            let Some(text_m) = RE_MSG_TEXT.captures(block).and_then(|c| c.get(1)) else {
                continue;
            };
            let text = normalize(&html_to_text(text_m.as_str()));
            if text.chars().count() < MIN_MESSAGE_CHARS {
                continue;
            }

            let link = RE_DATA_POST
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| format!("https://t.me/{}", m.as_str()));
            let image_url = RE_PHOTO
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());

            out.push(Fragment {
                text,
                link,
                image_url,
                source_name: self.name.clone(),
                kind: SourceKind::Channel,
            });
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
