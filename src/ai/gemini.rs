//! Gemini REST transport: batch `generateContent` and SSE streaming.

use super::types::{
    ApiError, Candidate, Content, ErrorEnvelope, GenerateContentResponse, GenerationRecord, Part,
    PromptFeedback, ResponseBody,
};
use super::GenerationService;
use crate::models::ModelId;
use crate::session::StreamSlot;
use crate::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [&'a Content; 1],
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, Client::new())
    }

    pub fn new_with_client(api_key: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self, model: ModelId, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Dispatch one POST. No per-request timeout is configured: a request
    /// that never settles stalls the chunk loop.
    async fn post(&self, url: &str, request: &GenerateRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                e
            })?;
        Ok(response)
    }

    fn error_record(status: u16, body_text: &str, content: &Content) -> GenerationRecord {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body_text).unwrap_or_else(|_| {
            ErrorEnvelope {
                error: ApiError {
                    code: None,
                    message: body_text.to_string(),
                    status: None,
                },
            }
        });

        GenerationRecord {
            ok: false,
            status,
            body: ResponseBody::Error(envelope),
            request_content: content.clone(),
        }
    }

    /// Feed one SSE line into the aggregator; true when candidate text grew.
    fn consume_sse_line(line: &str, aggregator: &mut StreamAggregator) -> bool {
        let Some(data) = line.strip_prefix("data:") else {
            return false;
        };
        let data = data.trim_start();
        if data.is_empty() {
            return false;
        }

        match serde_json::from_str::<GenerateContentResponse>(data) {
            Ok(chunk) => aggregator.push(chunk),
            Err(e) => {
                tracing::warn!("Skipping unparseable stream chunk: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, model: ModelId, content: &Content) -> Result<GenerationRecord> {
        let request = GenerateRequest { contents: [content] };
        let url = self.endpoint(model, "generateContent");
        tracing::debug!("Sending generateContent request (model: {})", model);

        let response = self.post(&url, &request).await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!("Gemini API error (status {}): {}", status, text);
            return Ok(Self::error_record(status.as_u16(), &text, content));
        }

        let body = serde_json::from_str::<GenerateContentResponse>(&text).unwrap_or_else(|e| {
            tracing::warn!("Unrecognized Gemini response shape: {}", e);
            GenerateContentResponse::default()
        });

        Ok(GenerationRecord {
            ok: true,
            status: status.as_u16(),
            body: ResponseBody::Success(body),
            request_content: content.clone(),
        })
    }

    async fn stream_generate(
        &self,
        model: ModelId,
        content: &Content,
        slot: &StreamSlot,
    ) -> Result<GenerationRecord> {
        let request = GenerateRequest { contents: [content] };
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        tracing::debug!("Sending streamGenerateContent request (model: {})", model);

        let response = self.post(&url, &request).await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            tracing::error!("Gemini API error (status {}): {}", status, text);
            return Ok(Self::error_record(status.as_u16(), &text, content));
        }

        let mut aggregator = StreamAggregator::default();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();

        while let Some(piece) = stream.next().await {
            let bytes = piece.map_err(|e| {
                tracing::error!("Gemini stream interrupted: {}", e);
                e
            })?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                if Self::consume_sse_line(line.trim_end(), &mut aggregator) {
                    slot.write(aggregator.text()).await?;
                }
            }
        }

        if Self::consume_sse_line(buffer.trim_end(), &mut aggregator) {
            slot.write(aggregator.text()).await?;
        }

        Ok(GenerationRecord {
            ok: true,
            status: status.as_u16(),
            body: ResponseBody::Success(aggregator.into_response()),
            request_content: content.clone(),
        })
    }
}

/// Merges streamed response chunks into one final response.
///
/// Candidate text concatenates across chunks; the finish reason is the
/// last one seen and the prompt feedback the first.
#[derive(Debug, Default)]
struct StreamAggregator {
    text: String,
    finish_reason: Option<String>,
    prompt_feedback: Option<PromptFeedback>,
    saw_candidate: bool,
}

impl StreamAggregator {
    /// Merge one chunk; returns true when candidate text was appended.
    fn push(&mut self, chunk: GenerateContentResponse) -> bool {
        if self.prompt_feedback.is_none() {
            self.prompt_feedback = chunk.prompt_feedback;
        }

        let Some(candidate) = chunk.candidates.into_iter().flatten().next() else {
            return false;
        };
        self.saw_candidate = true;

        if candidate.finish_reason.is_some() {
            self.finish_reason = candidate.finish_reason;
        }

        let mut grew = false;
        for part in candidate.content.into_iter().flat_map(|content| content.parts) {
            if let Part::Text { text } = part {
                if !text.is_empty() {
                    self.text.push_str(&text);
                    grew = true;
                }
            }
        }
        grew
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn into_response(self) -> GenerateContentResponse {
        let candidates = self.saw_candidate.then(|| {
            vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::Text { text: self.text }],
                }),
                finish_reason: self.finish_reason,
            }]
        });

        GenerateContentResponse {
            candidates,
            prompt_feedback: self.prompt_feedback,
        }
    }
}
