//! Response caching keyed by canonical request fingerprints.

use crate::ai::types::GenerationRecord;
use crate::models::{ActionType, LanguageCode, MediaType, ModelId};
use crate::session::{SessionStore, RESPONSE_CACHE_KEY};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Most recent entries kept; older ones are evicted first.
pub const CACHE_CAPACITY: usize = 10;

/// Canonical identity of one generation request.
///
/// Field order is fixed by declaration and serialized as-is, so the key
/// is deterministic; two requests differing in any field (including model
/// and language) produce different keys.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFingerprint<'a> {
    pub action_type: ActionType,
    pub media_type: MediaType,
    pub task_input: &'a str,
    pub language_model: ModelId,
    pub language_code: LanguageCode,
}

impl RequestFingerprint<'_> {
    pub fn canonical(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: GenerationRecord,
}

/// Append `value` under `key`, replacing any entry with the same key and
/// evicting from the front down to [`CACHE_CAPACITY`].
fn append_entry(mut queue: Vec<CacheEntry>, key: &str, value: GenerationRecord) -> Vec<CacheEntry> {
    queue.retain(|entry| entry.key != key);
    queue.push(CacheEntry {
        key: key.to_string(),
        value,
    });
    if queue.len() > CACHE_CAPACITY {
        let excess = queue.len() - CACHE_CAPACITY;
        queue.drain(..excess);
    }
    queue
}

fn decode_queue(value: Option<Value>) -> Vec<CacheEntry> {
    value
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Bounded session-scoped cache of generation results.
///
/// Lookups are exact key matches and do not reorder entries.
pub struct ResponseCache {
    store: Arc<dyn SessionStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<GenerationRecord>> {
        let queue = decode_queue(self.store.get(RESPONSE_CACHE_KEY).await?);
        Ok(queue
            .into_iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value))
    }

    /// Store one successful result. Callers only pass `ok` records;
    /// failures are never cached.
    pub async fn store(&self, key: &str, record: &GenerationRecord) -> Result<()> {
        let key = key.to_string();
        let record = record.clone();
        self.store
            .update(
                RESPONSE_CACHE_KEY,
                Box::new(move |current| {
                    let updated = append_entry(decode_queue(current), &key, record);
                    serde_json::to_value(updated).unwrap_or_else(|_| Value::Array(Vec::new()))
                }),
            )
            .await?;
        Ok(())
    }
}
