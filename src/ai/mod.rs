//! Generation transport for the chunked request loop.
//!
//! The orchestrator talks to the API through the [`GenerationService`]
//! trait; the Gemini client is the production implementation and the mock
//! backs the tests.

pub mod gemini;
pub mod mock;
pub mod types;

pub use gemini::GeminiClient;
pub use mock::MockGenerationClient;

use crate::models::ModelId;
use crate::session::StreamSlot;
use crate::Result;
use async_trait::async_trait;
use types::{Content, GenerationRecord};

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Issue one batch generation request and return its record.
    ///
    /// HTTP-level rejections come back as `ok = false` records rather
    /// than errors; only transport failures (the request never settled
    /// with a response) are `Err`.
    async fn generate(&self, model: ModelId, content: &Content) -> Result<GenerationRecord>;

    /// Streaming variant of [`GenerationService::generate`].
    ///
    /// Writes the partial accumulated text into `slot` as chunks arrive,
    /// then returns the merged final record.
    async fn stream_generate(
        &self,
        model: ModelId,
        content: &Content,
        slot: &StreamSlot,
    ) -> Result<GenerationRecord>;
}
