//! Presentation adapter: the user-facing surface behind a narrow sink.
//!
//! The pipeline never touches rendering directly; it reports status,
//! partial and final content, and busy transitions through [`DisplaySink`].
//! Interval-driven updates (the loading ticker and the streamed-partial
//! poller) are abort-on-drop guards so they are cancelled on every exit
//! path of the enclosing operation.

use crate::models::{ActionType, MediaType};
use crate::session::StreamSlot;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const MSG_PROMPT_BLOCKED: &str = "The prompt was blocked.";
pub const MSG_RESPONSE_BLOCKED: &str = "The response was blocked.";
pub const MSG_UNEXPECTED_RESPONSE: &str = "Received an unexpected response from the API.";
pub const MSG_NO_API_KEY: &str =
    "No API key is set. Open the options page and register your API key.";
pub const MSG_PROCESSING_ERROR: &str = "An error occurred while processing the request.";
pub const MSG_RETRIEVING_CAPTIONS: &str = "Retrieving captions";

/// Loading message for the action/media pair being processed.
pub fn loading_message(action: ActionType, media: MediaType) -> &'static str {
    match action {
        ActionType::Summarize => match media {
            MediaType::Captions => "Summarizing captions",
            MediaType::Image => "Summarizing the image",
            MediaType::Text => "Summarizing",
        },
        ActionType::Translate => match media {
            MediaType::Captions => "Translating captions",
            MediaType::Image => "Translating the image",
            MediaType::Text => "Translating",
        },
        ActionType::NoTextCustom(_) | ActionType::TextCustom(_) => "Processing",
    }
}

/// Text placed on the clipboard by the copy command: trailing newlines
/// collapsed to exactly one blank line.
pub fn clipboard_text(content: &str) -> String {
    format!("{}\n\n", content.trim_end_matches('\n'))
}

#[async_trait]
pub trait DisplaySink: Send + Sync {
    async fn show_status(&self, message: &str);
    async fn clear_status(&self);
    /// Replace the rendered content area with `content` (markdown source).
    async fn show_content(&self, content: &str);
    /// Toggle the surface's interactive affordances during a run.
    async fn set_busy(&self, busy: bool);
}

/// Terminal sink for the CLI: status goes to stderr, partial content to
/// the debug log. The final content is printed by the caller.
pub struct ConsoleDisplay;

#[async_trait]
impl DisplaySink for ConsoleDisplay {
    async fn show_status(&self, message: &str) {
        eprint!("\r\u{1b}[K{}", message);
    }

    async fn clear_status(&self) {
        eprint!("\r\u{1b}[K");
    }

    async fn show_content(&self, content: &str) {
        tracing::debug!("Content update ({} chars)", content.chars().count());
    }

    async fn set_busy(&self, _busy: bool) {}
}

/// Recording sink for tests. Clones share state, so a clone kept aside
/// acts as a probe.
#[derive(Clone, Default)]
pub struct MockDisplay {
    statuses: Arc<Mutex<Vec<String>>>,
    contents: Arc<Mutex<Vec<String>>>,
    busy_states: Arc<Mutex<Vec<bool>>>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<String> {
        self.contents.lock().unwrap().clone()
    }

    pub fn busy_states(&self) -> Vec<bool> {
        self.busy_states.lock().unwrap().clone()
    }

    pub fn last_content(&self) -> Option<String> {
        self.contents.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DisplaySink for MockDisplay {
    async fn show_status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }

    async fn clear_status(&self) {
        self.statuses.lock().unwrap().push(String::new());
    }

    async fn show_content(&self, content: &str) {
        self.contents.lock().unwrap().push(content.to_string());
    }

    async fn set_busy(&self, busy: bool) {
        self.busy_states.lock().unwrap().push(busy);
    }
}

/// Background interval task, aborted when the guard drops.
pub struct IntervalGuard {
    handle: JoinHandle<()>,
}

impl Drop for IntervalGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl IntervalGuard {
    /// Animated loading-status ticker (500 ms).
    pub fn status_ticker(display: Arc<dyn DisplaySink>, message: String) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            let mut dots = 0usize;
            loop {
                interval.tick().await;
                display
                    .show_status(&format!("{}{}", message, ".".repeat(dots)))
                    .await;
                dots = (dots + 1) % 4;
            }
        });
        Self { handle }
    }

    /// Streamed-partial poller (1 s): shows the accumulated output plus
    /// whatever partial text the transport has written to the slot.
    pub fn stream_poller(display: Arc<dyn DisplaySink>, slot: StreamSlot, accumulated: String) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                match slot.read().await {
                    Ok(Some(partial)) if !partial.is_empty() => {
                        display
                            .show_content(&format!("{}{}\n\n", accumulated, partial))
                            .await;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::debug!("Stream slot read failed: {}", e),
                }
            }
        });
        Self { handle }
    }
}
