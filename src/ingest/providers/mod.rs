// src/ingest/providers/mod.rs
pub mod channel;
pub mod site;

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) static RE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag strip regex"));
static RE_BR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));

/// Decode entities, turn `<br>` into newlines, strip the remaining
/// tags. Whitespace is left for the normalizer.
pub(crate) fn html_to_text(s: &str) -> String {
    let with_breaks = RE_BR.replace_all(s, "\n");
    let decoded = html_escape::decode_html_entities(&with_breaks)
        .replace('\u{a0}', " ");
    RE_TAGS.replace_all(&decoded, " ").to_string()
}

/// `scheme://host` of a URL, for resolving root-relative hrefs.
pub(crate) fn origin(url: &str) -> Option<String> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let host_end = rest.find('/').unwrap_or(rest.len());
    Some(format!("{}{}", &url[..scheme_end + 3], &rest[..host_end]))
}

/// Resolve an href against the page it came from. Anything that is
/// neither absolute nor root-relative is skipped.
pub(crate) fn join_href(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("https://") || href.starts_with("http://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix('/') {
        return origin(page_url).map(|o| format!("{o}/{rest}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_and_join() {
        assert_eq!(
            origin("https://afisha.example/events?page=2").as_deref(),
            Some("https://afisha.example")
        );
        assert_eq!(
            join_href("https://afisha.example/events", "/event/42").as_deref(),
            Some("https://afisha.example/event/42")
        );
        assert_eq!(
            join_href("https://afisha.example/events", "https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert!(join_href("https://afisha.example/events", "javascript:void(0)").is_none());
    }

    #[test]
    fn html_to_text_decodes_and_strips() {
        let s = "Митап&nbsp;по <b>Rust</b><br/>в Алматы";
        assert_eq!(crate::normalize::normalize(&html_to_text(s)), "Митап по Rust\nв Алматы");
    }
}
