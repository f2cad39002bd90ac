//! Page access collaborator.

use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;

/// Encode raw image bytes as a `data:` URI, the capture wire form.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// A 1x1 white JPEG, returned when a snapshot carries no real screenshot.
const PLACEHOLDER_SCREENSHOT: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQEAAAAAAAD/2wBDAAMCAgICAgMCAgIDAwMDBAYEBAQEBAgGBgUGCQgKCgkICQkKDA8MCgsOCwkJDRENDg8QEBEQCgwSExIQEw8QEBD/wAALCAABAAEBAREA/8QAFAABAAAAAAAAAAAAAAAAAAAACf/EABQQAQAAAAAAAAAAAAAAAAAAAAD/2gAIAQEAAD8AKp//2Q==";

/// The active page, as seen by the content source resolver.
///
/// Selection reads, extraction, and capture are all suspension points into
/// the host surface; failures are recoverable and advance the resolver's
/// fallback chain.
#[async_trait]
pub trait PageAccess: Send + Sync {
    /// URL of the active page.
    fn url(&self) -> &str;

    /// Current text selection; empty when nothing is selected.
    async fn selected_text(&self) -> Result<String>;

    /// Main-body text from the readability collaborator, when extraction
    /// finds an article.
    async fn article_text(&self) -> Result<Option<String>>;

    /// Raw page text, the fallback when extraction yields nothing.
    async fn body_text(&self) -> Result<String>;

    /// Visible-viewport screenshot as a JPEG data URI.
    async fn capture_screenshot(&self) -> Result<String>;
}

/// Fixed page snapshot backing the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    url: String,
    selection: String,
    article: Option<String>,
    body: String,
    screenshot: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = selection.into();
        self
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.article = Some(article.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = screenshot.into();
        self
    }
}

#[async_trait]
impl PageAccess for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn selected_text(&self) -> Result<String> {
        Ok(self.selection.clone())
    }

    async fn article_text(&self) -> Result<Option<String>> {
        Ok(self.article.clone())
    }

    async fn body_text(&self) -> Result<String> {
        Ok(self.body.clone())
    }

    async fn capture_screenshot(&self) -> Result<String> {
        if self.screenshot.is_empty() {
            Ok(PLACEHOLDER_SCREENSHOT.to_string())
        } else {
            Ok(self.screenshot.clone())
        }
    }
}
