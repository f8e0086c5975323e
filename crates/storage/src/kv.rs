use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::repository::StorageError;

/// String-keyed persistent store. Last write wins; no transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a raw value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a raw value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend rejects the write.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove a key. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend rejects the delete.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Drop every key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend rejects the delete.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the stored text is not valid JSON
/// for `T`, or any error from the store itself.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|err| StorageError::Serialization(format!("{key}: {err}")))
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails, or any error from the store.
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)
        .map_err(|err| StorageError::Serialization(format!("{key}: {err}")))?;
    store.set(key, raw).await
}

/// Process-local store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove_clear() {
        let store = InMemoryStore::new();
        store.set("a", "1".into()).await.unwrap();
        store.set("b", "2".into()).await.unwrap();
        store.set("a", "3".into()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("3"));

        store.remove("a").await.unwrap();
        store.remove("missing").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_helpers_report_bad_payloads() {
        let store = InMemoryStore::new();
        set_json(&store, "nums", &vec![1, 2, 3]).await.unwrap();
        let nums: Option<Vec<u32>> = get_json(&store, "nums").await.unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        store.set("broken", "{not json".into()).await.unwrap();
        let err = get_json::<Vec<u32>>(&store, "broken").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(msg) if msg.starts_with("broken")));
    }
}
