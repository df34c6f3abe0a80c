// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::assemble::Event;

/// Delivery seam. The pipeline records a dedup key only after
/// `publish` returns Ok.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &Event) -> Result<()>;
}

/// Render the fixed message shape: bold title, location, optional
/// venue, date, link.
pub fn render_message(e: &Event) -> String {
    let mut out = format!("<b>{}</b>\n", html_escape::encode_text(&e.title));
    if !e.location.is_empty() {
        out.push_str(&format!("📍 {}\n", html_escape::encode_text(&e.location)));
    }
    if !e.venue.is_empty() {
        out.push_str(&format!("🏛 {}\n", html_escape::encode_text(&e.venue)));
    }
    out.push_str(&format!("🗓 {}\n", e.date_display));
    out.push_str(&e.link);
    out
}

/// Logs instead of sending; used when no bot credentials are
/// configured (local dry runs).
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, event: &Event) -> Result<()> {
        tracing::info!(title = %event.title, link = %event.link, "dry-run publish");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape_has_all_lines() {
        let e = Event {
            title: "Митап <по Rust>".into(),
            date_display: "20 февраля 2026, 19:00".into(),
            location: "Алматы".into(),
            venue: "MOST Hub".into(),
            link: "https://t.me/chan/5".into(),
            source: "chan".into(),
            image_url: None,
        };
        let msg = render_message(&e);
        assert!(msg.starts_with("<b>Митап &lt;по Rust&gt;</b>\n"));
        assert!(msg.contains("📍 Алматы"));
        assert!(msg.contains("🏛 MOST Hub"));
        assert!(msg.contains("🗓 20 февраля 2026, 19:00"));
        assert!(msg.ends_with("https://t.me/chan/5"));
    }

    #[test]
    fn optional_venue_line_is_omitted() {
        let e = Event {
            title: "Хакатон".into(),
            date_display: "15 февраля 2026".into(),
            location: String::new(),
            venue: String::new(),
            link: "https://t.me/x".into(),
            source: "chan".into(),
            image_url: None,
        };
        let msg = render_message(&e);
        assert!(!msg.contains("🏛"));
        assert!(!msg.contains("📍"));
    }
}
