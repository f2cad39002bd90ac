//! Application orchestration: the per-chunk generation loop.

use crate::ai::types::{Content, GenerationRecord, ResponseBody, FINISH_REASON_STOP};
use crate::ai::{GeminiClient, GenerationService};
use crate::cache::{RequestFingerprint, ResponseCache};
use crate::chunk::chunk_text;
use crate::limits::character_limit;
use crate::models::{Settings, TaskInput, Trigger};
use crate::output::{
    loading_message, DisplaySink, IntervalGuard, MSG_NO_API_KEY, MSG_PROCESSING_ERROR,
    MSG_PROMPT_BLOCKED, MSG_RESPONSE_BLOCKED, MSG_UNEXPECTED_RESPONSE,
};
use crate::session::{
    self, SessionStore, StoredResult, StreamSlot,
};
use crate::source::{CaptionService, ContentResolver, HttpCaptionClient, PageAccess};
use crate::{prompts, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Classification of one chunk's generation record.
///
/// Every variant except `Text` terminates the chunk loop.
#[derive(Debug, PartialEq)]
enum ChunkOutcome {
    Text(String),
    PromptBlocked(String),
    ResponseBlocked(String),
    ApiError { status: u16, message: String },
    Unexpected,
}

fn classify(record: &GenerationRecord) -> ChunkOutcome {
    if !record.ok {
        let message = match &record.body {
            ResponseBody::Error(envelope) => envelope.error.message.clone(),
            ResponseBody::Success(_) => String::new(),
        };
        return ChunkOutcome::ApiError {
            status: record.status,
            message,
        };
    }

    let response = match &record.body {
        ResponseBody::Success(response) => response,
        ResponseBody::Error(_) => return ChunkOutcome::Unexpected,
    };

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
    {
        return ChunkOutcome::PromptBlocked(reason);
    }

    let Some(candidate) = response.candidates.as_ref().and_then(|list| list.first()) else {
        return ChunkOutcome::Unexpected;
    };

    match candidate.finish_reason.as_deref() {
        Some(FINISH_REASON_STOP) => {}
        Some(reason) => return ChunkOutcome::ResponseBlocked(reason.to_string()),
        None => return ChunkOutcome::ResponseBlocked("UNKNOWN".to_string()),
    }

    match record.candidate_text() {
        Some(text) => ChunkOutcome::Text(text.to_string()),
        None => ChunkOutcome::Unexpected,
    }
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub generation: Arc<dyn GenerationService>,
    pub page: Arc<dyn PageAccess>,
    pub captions: Arc<dyn CaptionService>,
    pub session: Arc<dyn SessionStore>,
    pub display: Arc<dyn DisplaySink>,
}

/// Coordinates content acquisition, chunking, caching, and the sequential
/// generation request loop for one surface.
pub struct App {
    generation: Arc<dyn GenerationService>,
    session: Arc<dyn SessionStore>,
    display: Arc<dyn DisplaySink>,
    resolver: ContentResolver,
    cache: ResponseCache,
    settings: Settings,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, settings: Settings) -> Self {
        let resolver = ContentResolver::new(
            services.page,
            services.captions,
            services.display.clone(),
        );
        let cache = ResponseCache::new(services.session.clone());

        Self {
            generation: services.generation,
            session: services.session,
            display: services.display,
            resolver,
            cache,
            settings,
        }
    }

    /// Construct an app over the live Gemini and caption transports.
    pub fn new(
        page: Arc<dyn PageAccess>,
        display: Arc<dyn DisplaySink>,
        settings: Settings,
    ) -> Self {
        // Reuse one HTTP connection pool across transports.
        let http_client = reqwest::Client::new();
        let generation = Arc::new(GeminiClient::new_with_client(
            settings.api_key.clone(),
            http_client.clone(),
        ));
        let captions = Arc::new(HttpCaptionClient::new_with_client(http_client));
        let session = Arc::new(session::MemorySessionStore::new());

        Self::with_services(
            AppServices {
                generation,
                page,
                captions,
                session,
                display,
            },
            settings,
        )
    }

    /// Run the pipeline once and return the final rendered content.
    ///
    /// `use_cache = false` is the explicit re-run command. Cleanup (busy
    /// flag, status, result-slot persistence) executes on both the
    /// success and failure paths.
    pub async fn run(&self, trigger: Trigger, use_cache: bool) -> Result<String> {
        let index = session::next_result_index(self.session.as_ref()).await?;
        debug!("Starting run into result slot {}", index);

        let mut content = String::new();
        let mut last_request: Option<Content> = None;

        self.display.set_busy(true).await;
        self.display.show_content("").await;

        let outcome = self
            .execute(trigger, use_cache, &mut content, &mut last_request)
            .await;

        if let Err(e) = outcome {
            error!("Run failed: {}", e);
            content.push_str(MSG_PROCESSING_ERROR);
        }

        self.display.clear_status().await;
        self.display.set_busy(false).await;
        self.display.show_content(&content).await;
        session::store_result(
            self.session.as_ref(),
            index,
            &StoredResult {
                request_api_content: last_request,
                response_content: content.clone(),
            },
        )
        .await?;

        Ok(content)
    }

    /// Recall the run stored in rotating slot `index`.
    pub async fn recall_result(&self, index: u32) -> Result<Option<StoredResult>> {
        session::load_result(self.session.as_ref(), index).await
    }

    async fn execute(
        &self,
        trigger: Trigger,
        use_cache: bool,
        content: &mut String,
        last_request: &mut Option<Content>,
    ) -> Result<()> {
        let source = self.resolver.resolve(trigger, &self.settings).await?;
        info!(
            "Resolved source: action={} media={}",
            source.action_type,
            source.media_type.as_str()
        );

        let _ticker = IntervalGuard::status_ticker(
            self.display.clone(),
            loading_message(source.action_type, source.media_type).to_string(),
        );

        let model = self.settings.language_model;
        let chunks = match &source.task_input {
            // Images are never split.
            TaskInput::Image(data) => vec![data.clone()],
            TaskInput::Text(text) => {
                chunk_text(text, character_limit(model, source.action_type))
            }
        };
        debug!("Processing {} chunk(s)", chunks.len());

        let slot = StreamSlot::new(self.session.clone());

        for chunk in &chunks {
            let key = RequestFingerprint {
                action_type: source.action_type,
                media_type: source.media_type,
                task_input: chunk,
                language_model: model,
                language_code: self.settings.language_code,
            }
            .canonical()?;

            let cached = if use_cache {
                self.cache.lookup(&key).await?
            } else {
                None
            };
            let from_cache = cached.is_some();

            let record = match cached {
                Some(record) => {
                    debug!("Serving chunk from cache");
                    record
                }
                None => {
                    let prompt = prompts::system_prompt(
                        source.action_type,
                        source.media_type,
                        self.settings.language_code,
                        chunk.chars().count(),
                        &self.settings,
                    );
                    let request =
                        prompts::build_api_content(&prompt, source.media_type, chunk)?;

                    if self.settings.streaming {
                        slot.clear().await?;
                        // Poller refreshes the display while the request is
                        // outstanding; dropped (aborted) however it settles.
                        let _poller = IntervalGuard::stream_poller(
                            self.display.clone(),
                            slot.clone(),
                            content.clone(),
                        );
                        self.generation.stream_generate(model, &request, &slot).await?
                    } else {
                        self.generation.generate(model, &request).await?
                    }
                }
            };

            *last_request = Some(record.request_content.clone());

            if record.ok && !from_cache {
                self.cache.store(&key, &record).await?;
            }

            match classify(&record) {
                ChunkOutcome::Text(text) => {
                    content.push_str(&text);
                    content.push_str("\n\n");
                    self.display.show_content(content).await;
                }
                ChunkOutcome::ApiError { status, message } => {
                    content.push_str(&format!("Error: {}\n\n{}", status, message));
                    if self.settings.api_key.is_empty() {
                        content.push_str(&format!("\n\n{}", MSG_NO_API_KEY));
                    }
                    break;
                }
                ChunkOutcome::PromptBlocked(reason) => {
                    content.push_str(&format!("{} Reason: {}", MSG_PROMPT_BLOCKED, reason));
                    break;
                }
                ChunkOutcome::ResponseBlocked(reason) => {
                    content.push_str(&format!("{} Reason: {}", MSG_RESPONSE_BLOCKED, reason));
                    break;
                }
                ChunkOutcome::Unexpected => {
                    content.push_str(MSG_UNEXPECTED_RESPONSE);
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{
        blocked_prompt_record, error_record, finish_reason_record, success_record,
    };
    use crate::ai::MockGenerationClient;
    use crate::models::ModelId;
    use crate::output::MockDisplay;
    use crate::session::MemorySessionStore;
    use crate::source::{MockCaptionService, StaticPage};
    use async_trait::async_trait;

    fn make_app(
        page: StaticPage,
        generation: MockGenerationClient,
        settings: Settings,
    ) -> (App, MockDisplay) {
        let display = MockDisplay::new();
        let probe = display.clone();
        let app = App::with_services(
            AppServices {
                generation: Arc::new(generation),
                page: Arc::new(page),
                captions: Arc::new(MockCaptionService::new()),
                session: Arc::new(MemorySessionStore::new()),
                display: Arc::new(display),
            },
            settings,
        );
        (app, probe)
    }

    fn settings_with_key() -> Settings {
        Settings {
            api_key: "test-key".to_string(),
            ..Settings::default()
        }
    }

    /// Build text that chunks into exactly `n` pieces under the translate
    /// budget (8192 chars). Each 8192-char window splits after the period
    /// at 6569, so every non-final chunk consumes 6570 chars (73
    /// sentences); the final 20 sentences (1800 chars) stay within budget.
    fn text_with_chunks(n: usize) -> String {
        let sentence = format!("{}.", "w".repeat(89));
        sentence.repeat(73 * (n - 1) + 20)
    }

    #[tokio::test]
    async fn test_run_translates_selection_and_persists_result() {
        let generation = MockGenerationClient::new().with_text_response("Bonjour le monde");
        let gen_probe = generation.clone();
        let page = StaticPage::new("https://example.com").with_selection("Hello world");
        let (app, display) = make_app(page, generation, settings_with_key());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(content, "Bonjour le monde\n\n");
        assert_eq!(gen_probe.get_call_count(), 1);

        let stored = app.recall_result(0).await.unwrap().unwrap();
        assert_eq!(stored.response_content, "Bonjour le monde\n\n");
        assert!(stored.request_api_content.is_some());

        // Busy toggled on then off, final content shown.
        assert_eq!(display.busy_states(), vec![true, false]);
        assert_eq!(display.last_content(), Some("Bonjour le monde\n\n".to_string()));
    }

    #[tokio::test]
    async fn test_chunks_are_processed_in_order_and_joined() {
        let generation = MockGenerationClient::new()
            .with_text_response("first")
            .with_text_response("second")
            .with_text_response("third");
        let gen_probe = generation.clone();
        let page =
            StaticPage::new("https://example.com").with_selection(text_with_chunks(3));
        let (app, _display) = make_app(page, generation, settings_with_key());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(content, "first\n\nsecond\n\nthird\n\n");
        assert_eq!(gen_probe.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_blocked_second_chunk_stops_the_loop_and_keeps_partial() {
        let generation = MockGenerationClient::new()
            .with_record(success_record("first"))
            .with_record(finish_reason_record("MAX_TOKENS"))
            .with_record(success_record("never requested"));
        let gen_probe = generation.clone();
        let page =
            StaticPage::new("https://example.com").with_selection(text_with_chunks(3));
        let (app, _display) = make_app(page, generation, settings_with_key());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(
            content,
            format!("first\n\n{} Reason: MAX_TOKENS", MSG_RESPONSE_BLOCKED)
        );
        // Chunk 3 is never requested.
        assert_eq!(gen_probe.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_prompt_blocked_stops_immediately() {
        let generation =
            MockGenerationClient::new().with_record(blocked_prompt_record("SAFETY"));
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let (app, _display) = make_app(page, generation, settings_with_key());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(content, format!("{} Reason: SAFETY", MSG_PROMPT_BLOCKED));
    }

    #[tokio::test]
    async fn test_api_error_includes_no_key_hint_when_key_missing() {
        let generation =
            MockGenerationClient::new().with_record(error_record(400, "API key not valid"));
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let (app, _display) = make_app(page, generation, Settings::default());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(
            content,
            format!("Error: 400\n\nAPI key not valid\n\n{}", MSG_NO_API_KEY)
        );
    }

    #[tokio::test]
    async fn test_api_error_without_hint_when_key_present() {
        let generation =
            MockGenerationClient::new().with_record(error_record(429, "quota exceeded"));
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let (app, _display) = make_app(page, generation, settings_with_key());

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(content, "Error: 429\n\nquota exceeded");
    }

    #[tokio::test]
    async fn test_failed_results_are_not_cached() {
        let generation = MockGenerationClient::new()
            .with_record(error_record(500, "internal"))
            .with_record(success_record("recovered"));
        let gen_probe = generation.clone();
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let (app, _display) = make_app(page, generation, settings_with_key());

        app.run(Trigger::Open, true).await.unwrap();
        let content = app.run(Trigger::Open, true).await.unwrap();

        // The failure was not cached, so the second run dispatched again.
        assert_eq!(gen_probe.get_call_count(), 2);
        assert_eq!(content, "recovered\n\n");
    }

    #[tokio::test]
    async fn test_second_cached_run_makes_no_transport_calls() {
        let generation = MockGenerationClient::new().with_text_response("cached answer");
        let gen_probe = generation.clone();
        let page = StaticPage::new("https://example.com").with_selection("same input");
        let (app, _display) = make_app(page, generation, settings_with_key());

        let first = app.run(Trigger::Open, true).await.unwrap();
        let second = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(gen_probe.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_rerun_command_ignores_the_cache() {
        let generation = MockGenerationClient::new().with_text_response("fresh answer");
        let gen_probe = generation.clone();
        let page = StaticPage::new("https://example.com").with_selection("same input");
        let (app, _display) = make_app(page, generation, settings_with_key());

        app.run(Trigger::Open, true).await.unwrap();
        app.run(Trigger::Open, false).await.unwrap();

        assert_eq!(gen_probe.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_streaming_run_produces_same_final_content() {
        let generation = MockGenerationClient::new().with_text_response("streamed text");
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let settings = Settings {
            streaming: true,
            ..settings_with_key()
        };
        let (app, _display) = make_app(page, generation, settings);

        let content = app.run(Trigger::Open, true).await.unwrap();
        assert_eq!(content, "streamed text\n\n");
    }

    #[tokio::test]
    async fn test_result_index_rotates_across_runs() {
        let generation = MockGenerationClient::new().with_text_response("answer");
        let page = StaticPage::new("https://example.com").with_selection("hello");
        let (app, _display) = make_app(page, generation, settings_with_key());

        app.run(Trigger::Open, false).await.unwrap();
        app.run(Trigger::Open, false).await.unwrap();

        assert!(app.recall_result(0).await.unwrap().is_some());
        assert!(app.recall_result(1).await.unwrap().is_some());
        assert!(app.recall_result(2).await.unwrap().is_none());
    }

    /// Transport that dies mid-run with a transport-level error.
    struct FailingGenerationClient;

    #[async_trait]
    impl GenerationService for FailingGenerationClient {
        async fn generate(
            &self,
            _model: ModelId,
            _content: &Content,
        ) -> Result<GenerationRecord> {
            Err(crate::Error::Generic("connection reset".to_string()))
        }

        async fn stream_generate(
            &self,
            model: ModelId,
            content: &Content,
            _slot: &StreamSlot,
        ) -> Result<GenerationRecord> {
            self.generate(model, content).await
        }
    }

    #[tokio::test]
    async fn test_transport_failure_reports_generic_error_and_cleans_up() {
        let display = MockDisplay::new();
        let probe = display.clone();
        let app = App::with_services(
            AppServices {
                generation: Arc::new(FailingGenerationClient),
                page: Arc::new(StaticPage::new("https://example.com").with_selection("hello")),
                captions: Arc::new(MockCaptionService::new()),
                session: Arc::new(MemorySessionStore::new()),
                display: Arc::new(display),
            },
            settings_with_key(),
        );

        let content = app.run(Trigger::Open, true).await.unwrap();

        assert_eq!(content, MSG_PROCESSING_ERROR);
        // Cleanup still ran: busy released and the run persisted.
        assert_eq!(probe.busy_states(), vec![true, false]);
        let stored = app.recall_result(0).await.unwrap().unwrap();
        assert_eq!(stored.response_content, MSG_PROCESSING_ERROR);
    }

    #[test]
    fn test_classify_prefers_prompt_block_over_candidates() {
        let mut record = blocked_prompt_record("SAFETY");
        record.ok = true;
        assert_eq!(
            classify(&record),
            ChunkOutcome::PromptBlocked("SAFETY".to_string())
        );
    }

    #[test]
    fn test_classify_empty_candidates_is_unexpected() {
        let mut record = success_record("ignored");
        if let ResponseBody::Success(response) = &mut record.body {
            response.candidates = Some(vec![]);
        }
        assert_eq!(classify(&record), ChunkOutcome::Unexpected);
    }

    #[test]
    fn test_classify_candidate_without_text_is_unexpected() {
        let record = finish_reason_record(FINISH_REASON_STOP);
        assert_eq!(classify(&record), ChunkOutcome::Unexpected);
    }
}
