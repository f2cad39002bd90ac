//! Session-scoped shared state behind a narrow store contract.
//!
//! The rotating result slots, the response cache queue, and the streaming
//! text slot all live in one key-value session store. The store is an
//! injected collaborator rather than ambient global state, and exposes an
//! atomic read-modify-write so concurrent surfaces cannot race on the
//! result-index increment.

use crate::ai::types::Content;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Number of rotating result slots kept per session.
pub const RESULT_SLOTS: u32 = 10;

pub const RESULT_INDEX_KEY: &str = "resultIndex";
pub const STREAM_CONTENT_KEY: &str = "streamContent";
pub const RESPONSE_CACHE_KEY: &str = "responseCacheQueue";

/// Key of the rotating result slot at `index`.
pub fn result_slot_key(index: u32) -> String {
    format!("r_{}", index)
}

pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> Value + Send>;

/// Key-value store scoped to the current session.
///
/// Cleared when the session ends; the pipeline never assumes persistence
/// beyond that. `update` is the only mutation primitive compound state
/// (cache queue, result index) may use.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Atomically replace the value at `key` with `apply(current)` and
    /// return the stored result.
    async fn update(&self, key: &str, apply: UpdateFn) -> Result<Value>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory session store used by the CLI process and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_entries(
    entries: &Mutex<HashMap<String, Value>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
    entries
        .lock()
        .map_err(|_| Error::Session("session store lock poisoned".to_string()))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock_entries(&self.entries)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        lock_entries(&self.entries)?.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, apply: UpdateFn) -> Result<Value> {
        let mut entries = lock_entries(&self.entries)?;
        let updated = apply(entries.get(key).cloned());
        entries.insert(key.to_string(), updated.clone());
        Ok(updated)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        lock_entries(&self.entries)?.remove(key);
        Ok(())
    }
}

/// Atomically advance the rotating result index and return the new slot.
///
/// Starts at 0 on a fresh session and wraps modulo [`RESULT_SLOTS`].
pub async fn next_result_index(store: &dyn SessionStore) -> Result<u32> {
    let updated = store
        .update(
            RESULT_INDEX_KEY,
            Box::new(|current| {
                let previous = current.and_then(|value| value.as_i64()).unwrap_or(-1);
                Value::from((previous + 1).rem_euclid(RESULT_SLOTS as i64))
            }),
        )
        .await?;
    Ok(updated.as_i64().unwrap_or(0) as u32)
}

/// One completed run, as recalled by the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    #[serde(rename = "requestApiContent", skip_serializing_if = "Option::is_none")]
    pub request_api_content: Option<Content>,
    #[serde(rename = "responseContent")]
    pub response_content: String,
}

/// Persist a finished run into its rotating slot.
pub async fn store_result(
    store: &dyn SessionStore,
    index: u32,
    result: &StoredResult,
) -> Result<()> {
    store
        .set(&result_slot_key(index), serde_json::to_value(result)?)
        .await
}

/// Recall the run stored at `index`, if any run has landed there yet.
pub async fn load_result(store: &dyn SessionStore, index: u32) -> Result<Option<StoredResult>> {
    match store.get(&result_slot_key(index)).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Shared slot the streaming transport writes partial text into and the
/// display poller reads while a request is outstanding.
#[derive(Clone)]
pub struct StreamSlot {
    store: Arc<dyn SessionStore>,
}

impl StreamSlot {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, text: &str) -> Result<()> {
        self.store.set(STREAM_CONTENT_KEY, Value::from(text)).await
    }

    pub async fn read(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(STREAM_CONTENT_KEY)
            .await?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(STREAM_CONTENT_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("key", Value::from("value")).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), Some(Value::from("value")));

        store.remove("key").await.unwrap();
        assert!(store.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_result_index_starts_at_zero_and_wraps() {
        let store = MemorySessionStore::new();

        assert_eq!(next_result_index(&store).await.unwrap(), 0);
        for expected in 1..RESULT_SLOTS {
            assert_eq!(next_result_index(&store).await.unwrap(), expected);
        }
        assert_eq!(next_result_index(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stored_result_round_trip() {
        let store = MemorySessionStore::new();
        let result = StoredResult {
            request_api_content: None,
            response_content: "1. A point.".to_string(),
        };

        store_result(&store, 3, &result).await.unwrap();
        assert_eq!(load_result(&store, 3).await.unwrap(), Some(result));
        assert_eq!(load_result(&store, 4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_result_slot_overwrites_previous_run() {
        let store = MemorySessionStore::new();
        let first = StoredResult {
            request_api_content: None,
            response_content: "first".to_string(),
        };
        let second = StoredResult {
            request_api_content: None,
            response_content: "second".to_string(),
        };

        store_result(&store, 0, &first).await.unwrap();
        store_result(&store, 0, &second).await.unwrap();
        assert_eq!(load_result(&store, 0).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_stream_slot_write_read_clear() {
        let slot = StreamSlot::new(Arc::new(MemorySessionStore::new()));

        assert_eq!(slot.read().await.unwrap(), None);
        slot.write("partial text").await.unwrap();
        assert_eq!(slot.read().await.unwrap(), Some("partial text".to_string()));
        slot.clear().await.unwrap();
        assert_eq!(slot.read().await.unwrap(), None);
    }
}
