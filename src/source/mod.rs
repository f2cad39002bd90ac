//! Content source resolution: deciding what page content feeds a run.
//!
//! Resolution tries sources in a fixed order — explicit screenshot
//! command, text selection, then an ordered fallback chain of captions,
//! article text, and screenshot capture. Acquisition failures are logged
//! and advance the chain; they never abort resolution.

pub mod captions;
pub mod page;

pub use captions::{CaptionService, HttpCaptionClient, MockCaptionService};
pub use page::{PageAccess, StaticPage};

use crate::models::{ActionType, LanguageCode, MediaType, Settings, TaskInput, Trigger};
use crate::output::{DisplaySink, IntervalGuard, MSG_RETRIEVING_CAPTIONS};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Recognized video-watch URL prefixes.
const WATCH_URL_PREFIXES: [&str; 2] = [
    "https://www.youtube.com/watch?v=",
    "https://m.youtube.com/watch?v=",
];

pub fn is_watch_url(url: &str) -> bool {
    WATCH_URL_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// Resolved content source for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub action_type: ActionType,
    pub media_type: MediaType,
    pub task_input: TaskInput,
}

/// One step of the no-selection fallback chain.
///
/// `Ok(None)` means "nothing here, try the next source"; errors are
/// handled the same way by the resolver after logging.
#[async_trait]
trait AcquireStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn acquire(&self) -> Result<Option<(MediaType, TaskInput)>>;
}

struct CaptionStrategy {
    page: Arc<dyn PageAccess>,
    captions: Arc<dyn CaptionService>,
    display: Arc<dyn DisplaySink>,
    language: LanguageCode,
}

#[async_trait]
impl AcquireStrategy for CaptionStrategy {
    fn name(&self) -> &'static str {
        "captions"
    }

    async fn acquire(&self) -> Result<Option<(MediaType, TaskInput)>> {
        let url = self.page.url();
        if !is_watch_url(url) {
            return Ok(None);
        }

        // Ticker is dropped on every exit path, including errors.
        let _ticker = IntervalGuard::status_ticker(
            self.display.clone(),
            MSG_RETRIEVING_CAPTIONS.to_string(),
        );
        let transcript = self.captions.transcript(url, self.language).await?;

        if transcript.is_empty() {
            Ok(None)
        } else {
            Ok(Some((MediaType::Captions, TaskInput::Text(transcript))))
        }
    }
}

struct ArticleStrategy {
    page: Arc<dyn PageAccess>,
}

#[async_trait]
impl AcquireStrategy for ArticleStrategy {
    fn name(&self) -> &'static str {
        "article"
    }

    async fn acquire(&self) -> Result<Option<(MediaType, TaskInput)>> {
        let text = match self.page.article_text().await? {
            Some(article) if !article.is_empty() => article,
            _ => {
                tracing::debug!("Article extraction yielded nothing, using raw page text");
                self.page.body_text().await?
            }
        };

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some((MediaType::Text, TaskInput::Text(text))))
        }
    }
}

struct ScreenshotStrategy {
    page: Arc<dyn PageAccess>,
}

#[async_trait]
impl AcquireStrategy for ScreenshotStrategy {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    async fn acquire(&self) -> Result<Option<(MediaType, TaskInput)>> {
        let screenshot = self.page.capture_screenshot().await?;
        Ok(Some((MediaType::Image, TaskInput::Image(screenshot))))
    }
}

/// Decides which content source feeds the pipeline.
pub struct ContentResolver {
    page: Arc<dyn PageAccess>,
    captions: Arc<dyn CaptionService>,
    display: Arc<dyn DisplaySink>,
}

impl ContentResolver {
    pub fn new(
        page: Arc<dyn PageAccess>,
        captions: Arc<dyn CaptionService>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            page,
            captions,
            display,
        }
    }

    /// Resolve the action, media kind, and payload for one run.
    pub async fn resolve(&self, trigger: Trigger, settings: &Settings) -> Result<SourceOutcome> {
        // The dedicated screenshot command bypasses every other source.
        if trigger == Trigger::Screenshot {
            let screenshot = self.page.capture_screenshot().await?;
            return Ok(SourceOutcome {
                action_type: settings.no_text_action,
                media_type: MediaType::Image,
                task_input: TaskInput::Image(screenshot),
            });
        }

        let selection = match self.page.selected_text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read the selection: {}", e);
                String::new()
            }
        };

        if !selection.is_empty() {
            let action_type = match trigger {
                Trigger::Custom(slot) => ActionType::TextCustom(slot),
                _ => settings.text_action,
            };
            return Ok(SourceOutcome {
                action_type,
                media_type: MediaType::Text,
                task_input: TaskInput::Text(selection),
            });
        }

        let action_type = match trigger {
            Trigger::Custom(slot) => ActionType::NoTextCustom(slot),
            _ => settings.no_text_action,
        };

        let fallbacks: [Box<dyn AcquireStrategy>; 3] = [
            Box::new(CaptionStrategy {
                page: self.page.clone(),
                captions: self.captions.clone(),
                display: self.display.clone(),
                language: settings.language_code,
            }),
            Box::new(ArticleStrategy {
                page: self.page.clone(),
            }),
            Box::new(ScreenshotStrategy {
                page: self.page.clone(),
            }),
        ];

        for strategy in &fallbacks {
            match strategy.acquire().await {
                Ok(Some((media_type, task_input))) => {
                    return Ok(SourceOutcome {
                        action_type,
                        media_type,
                        task_input,
                    });
                }
                Ok(None) => tracing::debug!("Source '{}' found nothing", strategy.name()),
                Err(e) => tracing::warn!("Source '{}' failed: {}", strategy.name(), e),
            }
        }

        Err(Error::Page("no content source produced input".to_string()))
    }
}
