use async_trait::async_trait;

use quote_core::db::{DbConfig, StoreFactory};
use quote_core::{KeyValueStore, RepositoryError};

use crate::repository::SqliteStore;

/// [`StoreFactory`] for SQLite.
///
/// Register this with a [`quote_core::db::StoreRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use quote_core::db::StoreRegistry;
/// use quote_db_sqlite::SqliteStoreFactory;
///
/// let mut registry = StoreRegistry::new();
/// registry.register(Box::new(SqliteStoreFactory));
/// ```
pub struct SqliteStoreFactory;

#[async_trait]
impl StoreFactory for SqliteStoreFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// Accepted connection-string values:
    /// * A bare file path, e.g. `"quotes.db"`. The file is created if it
    ///   does not exist.
    /// * A sqlx URL, e.g. `"sqlite:quotes.db?mode=rwc"`.
    /// * `":memory:"`, an ephemeral in-memory database (useful for tests).
    async fn create(&self, config: &DbConfig) -> Result<Box<dyn KeyValueStore>, RepositoryError> {
        let store = SqliteStore::new(&config.connection_string).await?;
        store.run_migrations().await?;
        Ok(Box::new(store))
    }
}
