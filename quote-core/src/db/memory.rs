use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::factory::{DbConfig, StoreFactory};
use super::repository::{KeyValueStore, RepositoryError};

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, RepositoryError> {
        self.entries
            .lock()
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        self.lock()?.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Registers [`MemoryStore`] as the `memory` backend.
pub struct MemoryStoreFactory;

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, _config: &DbConfig) -> Result<Box<dyn KeyValueStore>, RepositoryError> {
        Ok(Box::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn write_read_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.read("users").await.unwrap(), None);

        store.write("users", &json!([{"email": "a@b.es"}])).await.unwrap();
        assert_eq!(
            store.read("users").await.unwrap(),
            Some(json!([{"email": "a@b.es"}]))
        );

        store.remove("users").await.unwrap();
        store.remove("users").await.unwrap();
        assert_eq!(store.read("users").await.unwrap(), None);
    }

    #[tokio::test]
    async fn factory_creates_empty_store() {
        let store = MemoryStoreFactory.create(&DbConfig::default()).await.unwrap();

        assert_eq!(store.read("quotes").await.unwrap(), None);
    }
}
