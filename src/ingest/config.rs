// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "AFISHA_SOURCES_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sites: Vec<SourceCfg>,
    #[serde(default)]
    pub channels: Vec<SourceCfg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceCfg {
    pub name: String,
    pub url: String,
}

impl SourcesConfig {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() && self.channels.is_empty()
    }
}

/// Load a sources list from an explicit path. TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, &ext)
}

/// Load with env override + fallbacks:
/// 1) $AFISHA_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("AFISHA_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(SourcesConfig::default())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing sources json");
    }
    if let Ok(v) = toml::from_str::<SourcesConfig>(s) {
        return Ok(v);
    }
    serde_json::from_str(s).context("unsupported sources format")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_both_parse() {
        let toml = r#"
[[sites]]
name = "Афиша города"
url = "https://afisha.example/events"

[[channels]]
name = "it_events"
url = "https://t.me/s/it_events"
"#;
        let cfg = parse_sources(toml, "toml").unwrap();
        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.channels[0].name, "it_events");

        let json = r#"{"sites":[],"channels":[{"name":"x","url":"https://t.me/s/x"}]}"#;
        let cfg = parse_sources(json, "json").unwrap();
        assert!(cfg.sites.is_empty());
        assert_eq!(cfg.channels.len(), 1);
    }

    #[serial_test::serial]
    #[test]
    fn default_is_empty_without_files() {
        std::env::remove_var(ENV_PATH);
        let tmp = tempfile::tempdir().unwrap();
        let old = std::env::current_dir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();

        let cfg = load_sources_default().unwrap();
        assert!(cfg.is_empty());

        std::env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn env_path_takes_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("sources.json");
        std::fs::write(&p, r#"{"sites":[{"name":"s","url":"https://s.example"}]}"#).unwrap();
        std::env::set_var(ENV_PATH, p.display().to_string());

        let cfg = load_sources_default().unwrap();
        assert_eq!(cfg.sites[0].name, "s");

        std::env::remove_var(ENV_PATH);
    }
}
