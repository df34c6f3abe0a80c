// src/notify/telegram.rs
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use super::{render_message, Publisher};
use crate::assemble::Event;

/// Transport seam under the publisher: the two Bot API sends. Lets the
/// photo-failure fallback be exercised without a live bot, the same
/// way `FixtureFetcher` stands in for `HttpFetcher`.
#[async_trait]
trait BotApi: Send + Sync {
    async fn send_photo(&self, event: &Event, image_url: &str) -> Result<()>;
    async fn send_text(&self, event: &Event) -> Result<()>;
}

#[derive(Clone)]
struct HttpApi {
    token: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
}

impl HttpApi {
    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call<P: Serialize>(&self, method: &str, payload: &P) -> Result<()> {
        let rsp = self
            .client
            .post(self.api_url(method))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| anyhow!("telegram {method} request failed: {e}"))?;
        rsp.error_for_status_ref()
            .map_err(|e| anyhow!("telegram {method} HTTP error: {e}"))?;
        Ok(())
    }
}

#[async_trait]
impl BotApi for HttpApi {
    async fn send_photo(&self, event: &Event, image_url: &str) -> Result<()> {
        #[derive(Serialize)]
        struct SendPhoto<'a> {
            chat_id: &'a str,
            photo: &'a str,
            caption: String,
            parse_mode: &'a str,
        }
        self.call(
            "sendPhoto",
            &SendPhoto {
                chat_id: &self.chat_id,
                photo: image_url,
                caption: render_message(event),
                parse_mode: "HTML",
            },
        )
        .await
    }

    async fn send_text(&self, event: &Event) -> Result<()> {
        #[derive(Serialize)]
        struct SendMessage<'a> {
            chat_id: &'a str,
            text: String,
            parse_mode: &'a str,
        }
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id: &self.chat_id,
                text: render_message(event),
                parse_mode: "HTML",
            },
        )
        .await
    }
}

/// Photo send first when an image is attached; any photo failure (bad
/// image URL is common) falls back to one text-only send of the same
/// content.
async fn deliver(api: &dyn BotApi, event: &Event) -> Result<()> {
    if let Some(image_url) = event.image_url.as_deref() {
        match api.send_photo(event, image_url).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(error = %e, link = %event.link, "photo send failed, falling back to text");
            }
        }
    }
    api.send_text(event).await
}

#[derive(Clone)]
pub struct TelegramPublisher {
    api: HttpApi,
}

impl TelegramPublisher {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            api: HttpApi {
                token,
                chat_id,
                client: Client::new(),
                timeout: Duration::from_secs(10),
            },
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.api.timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, event: &Event) -> Result<()> {
        deliver(&self.api, event).await
    }
}
