// src/refine.rs
//! Optional external title cleanup (a hosted language model).
//!
//! Strictly a fallback helper: the deterministic cleaner and the
//! classifier operate correctly with this collaborator entirely
//! absent. No credentials configured → a no-op client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verdict from the external cleaner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refined {
    /// The fragment is not an event announcement at all.
    NotAnEvent,
    /// A cleaned title string.
    Title(String),
}

#[async_trait]
pub trait TitleRefiner: Send + Sync {
    /// `None` means "no opinion" (disabled, over limit, or failed);
    /// the caller falls back to the deterministic path.
    async fn refine(&self, raw: &str) -> Option<Refined>;
    fn name(&self) -> &'static str;
}

/// Always declines. Used when no API key is configured.
pub struct DisabledRefiner;

#[async_trait]
impl TitleRefiner for DisabledRefiner {
    async fn refine(&self, _raw: &str) -> Option<Refined> {
        None
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub struct OpenAiRefiner {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiRefiner {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("afisha-bot/0.1 (+github.com/afisha-bot)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

const SYSTEM_PROMPT: &str = "Ты чистишь заголовки анонсов мероприятий. \
Верни ТОЛЬКО короткое название события одной строкой, без даты, города и описания. \
Если текст не является анонсом мероприятия, верни ровно NOT_EVENT.";

#[async_trait]
impl TitleRefiner for OpenAiRefiner {
    async fn refine(&self, raw: &str) -> Option<Refined> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: raw,
                },
            ],
            temperature: 0.1,
            max_tokens: 60,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or("");
        if content.is_empty() {
            return None;
        }
        if content.eq_ignore_ascii_case("NOT_EVENT") {
            return Some(Refined::NotAnEvent);
        }
        let cleaned = sanitize_title(content);
        if cleaned.chars().count() < 5 {
            return None;
        }
        Some(Refined::Title(cleaned))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Single line, collapsed whitespace, capped length.
fn sanitize_title(input: &str) -> String {
    let mut out = String::with_capacity(120);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = if ch.is_whitespace() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= 120 {
            break;
        }
    }
    out.trim().trim_matches('"').to_string()
}

pub type DynRefiner = Arc<dyn TitleRefiner>;

/// Build from environment: `OPENAI_API_KEY` present → real client,
/// otherwise the disabled no-op.
pub fn build_refiner_from_env() -> DynRefiner {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Arc::new(OpenAiRefiner::new(key, None)),
        _ => Arc::new(DisabledRefiner),
    }
}

/// Fixed-verdict refiner for tests.
pub struct FixedRefiner(pub Option<Refined>);

#[async_trait]
impl TitleRefiner for FixedRefiner {
    async fn refine(&self, _raw: &str) -> Option<Refined> {
        self.0.clone()
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}
