// src/ingest/types.rs
use anyhow::Result;

/// Where a fragment came from. Page-scraped fragments pass an extra
/// navigation-trash filter before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    Page,
    Channel,
}

/// One raw scraped unit: free-form text (first line is the title
/// candidate, following lines are context), plus optional link/image.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fragment {
    pub text: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub source_name: String,
    pub kind: SourceKind,
}

impl Fragment {
    /// The title candidate: first non-empty line of the text.
    pub fn title_line(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync {
    async fn fetch_fragments(&self) -> Result<Vec<Fragment>>;
    fn name(&self) -> &str;
}
