//! Gemini payload types shared by the batch and streaming transports.

use serde::{Deserialize, Serialize};

/// Finish reason reported on normally completed candidates. Any other
/// value means the response was cut short or withheld.
pub const FINISH_REASON_STOP: &str = "STOP";

/// Gemini content container used in both requests and responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// Untagged union of text and inline media content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 inline payload used for image requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Candidate completion item returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Raw provider string; unrecognized values surface verbatim to the
    /// user, so this is not narrowed to an enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Prompt-level safety feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Success or error payload carried by a [`GenerationRecord`].
///
/// `Error` must come first: every field of the success shape is optional,
/// so untagged decoding would otherwise swallow error bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Error(ErrorEnvelope),
    Success(GenerateContentResponse),
}

/// Outcome of one generation request, as cached and classified.
///
/// Created per chunk request and never mutated afterwards. `ok` mirrors
/// the HTTP-level success of the call; API-level blocking still arrives
/// as an `ok` record and is classified by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub ok: bool,
    pub status: u16,
    pub body: ResponseBody,
    /// Echo of the request content, persisted with the run result.
    #[serde(rename = "requestApiContent")]
    pub request_content: Content,
}

impl GenerationRecord {
    /// First candidate text, when the response carries a usable one.
    pub fn candidate_text(&self) -> Option<&str> {
        let ResponseBody::Success(response) = &self.body else {
            return None;
        };
        let candidate = response.candidates.as_ref()?.first()?;
        candidate.content.as_ref()?.parts.iter().find_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            Part::InlineData { .. } => None,
        })
    }
}
