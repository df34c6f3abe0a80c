// src/dedup.rs
//! Canonical-link deduplication across runs.
//!
//! Links pointing at the same real-world item arrive in several
//! spellings (preview path, tracking query, trailing slash). They all
//! normalize to one canonical key; a key is recorded only after the
//! publisher confirms the send, so a failed send is retried naturally
//! on the next run.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Storage ceiling: oldest keys are evicted past this at flush time.
/// A bound on file growth, not a correctness rule.
const MAX_KEYS: usize = 5000;

/// In-run secondary key: lower-cased title prefix length.
const TITLE_KEY_CHARS: usize = 40;

/// Normalize a link into its canonical dedup key. Applied in fixed
/// order: scheme, preview path, query string, trailing slash.
pub fn canonicalize(link: &str) -> String {
    let mut s = link.trim().to_string();
    if let Some(rest) = s.strip_prefix("http://") {
        s = format!("https://{rest}");
    }
    // Channel preview URLs point at the same post as the direct form.
    s = s.replace("t.me/s/", "t.me/");
    if let Some(q) = s.find('?') {
        s.truncate(q);
    }
    if s.len() > 1 && s.ends_with('/') {
        s.pop();
    }
    s
}

/// Secondary key for collapsing near-duplicates gathered from several
/// sources within one run. Never persisted.
pub fn title_key(title: &str) -> String {
    title.to_lowercase().chars().take(TITLE_KEY_CHARS).collect()
}

/// Persisted set of canonical keys, append-only within a run.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    keys: Vec<String>,
    index: HashSet<String>,
}

impl DedupStore {
    /// Load from `path`. A missing or unreadable snapshot degrades to
    /// an empty store (may re-publish already-seen items) rather than
    /// failing the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys: Vec<String> = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "dedup snapshot unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        let index = keys.iter().cloned().collect();
        Self { path, keys, index }
    }

    pub fn seen(&self, key: &str) -> bool {
        self.index.contains(key)
    }

    /// Append-only. Call only after the publisher confirmed the send.
    pub fn record(&mut self, key: &str) {
        if self.index.insert(key.to_string()) {
            self.keys.push(key.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialize the full set, overwriting the previous snapshot.
    /// Oldest keys fall off past the ceiling. Write failure is the one
    /// condition that must surface loudly: a silently lost snapshot
    /// means repeat publication on every subsequent run.
    pub fn flush(&self) -> Result<()> {
        let start = self.keys.len().saturating_sub(MAX_KEYS);
        let snapshot = &self.keys[start..];
        let json = serde_json::to_string(snapshot).context("serializing dedup snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes())
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_query_and_trailing_slash_are_equivalent() {
        let a = canonicalize("https://example.com/events/42?utm_source=tg");
        let b = canonicalize("https://example.com/events/42/");
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/events/42");
    }

    #[test]
    fn preview_path_and_scheme_normalize() {
        let a = canonicalize("https://t.me/s/chan/123?x=1");
        let b = canonicalize("http://t.me/chan/123/");
        assert_eq!(a, b);
        assert_eq!(a, "https://t.me/chan/123");
    }

    #[test]
    fn record_is_idempotent_append() {
        let mut store = DedupStore::load("/nonexistent/posted.json");
        assert!(store.is_empty());
        store.record("k1");
        store.record("k1");
        store.record("k2");
        assert_eq!(store.len(), 2);
        assert!(store.seen("k1"));
        assert!(!store.seen("k3"));
    }

    #[test]
    fn title_key_is_lowercased_prefix() {
        let k = title_key("Внедрение AI в бизнес");
        assert_eq!(k, "внедрение ai в бизнес");
        let long = "x".repeat(100);
        assert_eq!(title_key(&long).chars().count(), 40);
    }
}
