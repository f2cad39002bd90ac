use super::types::{
    ApiError, Candidate, Content, ErrorEnvelope, GenerateContentResponse, GenerationRecord, Part,
    PromptFeedback, ResponseBody, FINISH_REASON_STOP,
};
use super::GenerationService;
use crate::models::ModelId;
use crate::session::StreamSlot;
use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Build a normally completed record carrying `text`.
///
/// The request echo is filled in at dispatch time, so it starts empty.
pub fn success_record(text: &str) -> GenerationRecord {
    GenerationRecord {
        ok: true,
        status: 200,
        body: ResponseBody::Success(GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::Text {
                        text: text.to_string(),
                    }],
                }),
                finish_reason: Some(FINISH_REASON_STOP.to_string()),
            }]),
            prompt_feedback: None,
        }),
        request_content: empty_content(),
    }
}

/// Build an `ok` record whose candidate finished for `reason` (not STOP).
pub fn finish_reason_record(reason: &str) -> GenerationRecord {
    GenerationRecord {
        ok: true,
        status: 200,
        body: ResponseBody::Success(GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![],
                }),
                finish_reason: Some(reason.to_string()),
            }]),
            prompt_feedback: None,
        }),
        request_content: empty_content(),
    }
}

/// Build an `ok` record blocked at the prompt level.
pub fn blocked_prompt_record(reason: &str) -> GenerationRecord {
    GenerationRecord {
        ok: true,
        status: 200,
        body: ResponseBody::Success(GenerateContentResponse {
            candidates: None,
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some(reason.to_string()),
            }),
        }),
        request_content: empty_content(),
    }
}

/// Build a non-ok record carrying a provider error message.
pub fn error_record(status: u16, message: &str) -> GenerationRecord {
    GenerationRecord {
        ok: false,
        status,
        body: ResponseBody::Error(ErrorEnvelope {
            error: ApiError {
                code: Some(status as i64),
                message: message.to_string(),
                status: None,
            },
        }),
        request_content: empty_content(),
    }
}

fn empty_content() -> Content {
    Content {
        role: None,
        parts: vec![],
    }
}

/// Scripted generation service for tests.
///
/// Queued records are returned in order and cycle once exhausted; with an
/// empty queue every call succeeds with a fixed text. Clones share state,
/// so a clone kept aside acts as a probe for call counts and captured
/// requests.
#[derive(Clone)]
pub struct MockGenerationClient {
    records: Arc<Mutex<Vec<GenerationRecord>>>,
    requests: Arc<Mutex<Vec<Content>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_record(self, record: GenerationRecord) -> Self {
        self.records.lock().unwrap().push(record);
        self
    }

    pub fn with_text_response(self, text: &str) -> Self {
        let record = success_record(text);
        self.with_record(record)
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Request contents captured in dispatch order.
    pub fn requests(&self) -> Vec<Content> {
        self.requests.lock().unwrap().clone()
    }

    fn next_record(&self, content: &Content) -> GenerationRecord {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        self.requests.lock().unwrap().push(content.clone());

        let records = self.records.lock().unwrap();
        let mut record = if records.is_empty() {
            success_record("Mock generated text")
        } else {
            records[(*count - 1) % records.len()].clone()
        };
        record.request_content = content.clone();
        record
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn generate(&self, _model: ModelId, content: &Content) -> Result<GenerationRecord> {
        Ok(self.next_record(content))
    }

    async fn stream_generate(
        &self,
        _model: ModelId,
        content: &Content,
        slot: &StreamSlot,
    ) -> Result<GenerationRecord> {
        let record = self.next_record(content);
        if let Some(text) = record.candidate_text() {
            slot.write(text).await?;
        }
        Ok(record)
    }
}
