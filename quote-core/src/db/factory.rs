use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::repository::{KeyValueStore, RepositoryError};

/// The `[database]` section of `quoter.toml`.
///
/// `backend` picks the store; `connection_string` means whatever that store
/// needs to find its data.
///
/// | backend    | connection_string                   |
/// |------------|-------------------------------------|
/// | `sqlite`   | `quotes.db`, `:memory:`             |
/// | `memory`   | ignored                             |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`KeyValueStore`] for one backend.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Value of `backend` in `[database]` that selects this factory.
    fn backend_name(&self) -> &'static str;

    /// Opens the store at `config.connection_string`, creating it when it
    /// does not exist yet.
    async fn create(&self, config: &DbConfig) -> Result<Box<dyn KeyValueStore>, RepositoryError>;
}

/// Backends `quoter` knows how to open.
pub struct StoreRegistry {
    factories: HashMap<&'static str, Box<dyn StoreFactory>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A later factory with the same backend name wins.
    pub fn register(&mut self, factory: Box<dyn StoreFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the store named by `config.backend`.
    ///
    /// An unregistered backend is a [`RepositoryError::Configuration`] that
    /// lists the backends that are available.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn KeyValueStore>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::{DbConfig, KeyValueStore, RepositoryError, StoreFactory, StoreRegistry};
    use crate::db::{MemoryStore, MemoryStoreFactory};

    /// Opens a memory store whose `origin` key records which backend and
    /// connection string produced it.
    struct TaggingFactory(&'static str);

    #[async_trait]
    impl StoreFactory for TaggingFactory {
        fn backend_name(&self) -> &'static str {
            self.0
        }

        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn KeyValueStore>, RepositoryError> {
            let store = MemoryStore::new();
            let origin = json!({ "backend": self.0, "connection": config.connection_string });
            store.write("origin", &origin).await?;
            Ok(Box::new(store))
        }
    }

    /// A database file that cannot be opened.
    struct UnreachableFactory;

    #[async_trait]
    impl StoreFactory for UnreachableFactory {
        fn backend_name(&self) -> &'static str {
            "sqlite"
        }

        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn KeyValueStore>, RepositoryError> {
            Err(RepositoryError::Connection(format!(
                "cannot open {}",
                config.connection_string
            )))
        }
    }

    fn database(backend: &str, connection_string: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            connection_string: connection_string.to_string(),
        }
    }

    async fn origin(store: &dyn KeyValueStore) -> Option<Value> {
        store.read("origin").await.unwrap()
    }

    #[test]
    fn default_database_is_in_memory_sqlite() {
        assert_eq!(DbConfig::default(), database("sqlite", ":memory:"));
    }

    #[test]
    fn database_section_fills_missing_fields() {
        let config: DbConfig =
            serde_json::from_value(json!({ "connection_string": "quotes.db" })).unwrap();

        assert_eq!(config, database("sqlite", "quotes.db"));
    }

    #[test]
    fn backends_are_listed_by_name() {
        let mut registry = StoreRegistry::new();
        assert!(registry.available_backends().is_empty());

        registry.register(Box::new(TaggingFactory("sqlite")));
        registry.register(Box::new(MemoryStoreFactory));

        assert_eq!(registry.available_backends(), vec!["memory", "sqlite"]);
    }

    #[tokio::test]
    async fn store_comes_from_the_configured_backend() {
        let mut registry = StoreRegistry::new();
        registry.register(Box::new(TaggingFactory("sqlite")));
        registry.register(Box::new(TaggingFactory("memory")));

        let store = registry.create(&database("sqlite", "quotes.db")).await.unwrap();

        assert_eq!(
            origin(store.as_ref()).await,
            Some(json!({ "backend": "sqlite", "connection": "quotes.db" }))
        );
    }

    #[tokio::test]
    async fn later_registration_replaces_backend() {
        let mut registry = StoreRegistry::new();
        registry.register(Box::new(TaggingFactory("memory")));
        registry.register(Box::new(MemoryStoreFactory));

        let store = registry.create(&database("memory", "")).await.unwrap();

        assert_eq!(registry.available_backends(), vec!["memory"]);
        assert_eq!(origin(store.as_ref()).await, None);
    }

    #[tokio::test]
    async fn unknown_backend_lists_alternatives() {
        let mut registry = StoreRegistry::new();
        registry.register(Box::new(MemoryStoreFactory));

        match registry.create(&database("postgres", "")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"));
                assert!(msg.contains("memory"));
            }
            Err(other) => panic!("expected a configuration error, got {other:?}"),
            Ok(_) => panic!("expected a configuration error, got a store"),
        }
    }

    #[tokio::test]
    async fn backend_open_failure_is_returned() {
        let mut registry = StoreRegistry::new();
        registry.register(Box::new(UnreachableFactory));

        let result = registry.create(&database("sqlite", "/no/such/dir/q.db")).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(msg)) if msg == "cannot open /no/such/dir/q.db"
        ));
    }
}
