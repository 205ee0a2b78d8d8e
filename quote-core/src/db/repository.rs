use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{SavedQuote, StoredUser, User, normalize_email};

/// Key holding every registered account.
pub const USERS_KEY: &str = "users";
/// Key holding every saved quote of every account.
pub const QUOTES_KEY: &str = "quotes";
/// Key holding the logged-in profile.
pub const SESSION_KEY: &str = "currentUser";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Already exists: {0}")]
    Duplicate(String),
}

/// Durable JSON key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError>;

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        (**self).remove(key).await
    }
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        (**self).remove(key).await
    }
}

/// Fields of a profile that may change after registration.
///
/// `None` leaves the field as it is; an empty string clears an optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub commercial_name: Option<String>,
    pub prepared_by: Option<String>,
}

/// Accounts and saved quotes on top of a [`KeyValueStore`].
///
/// Both collections are stored whole under [`USERS_KEY`] and [`QUOTES_KEY`];
/// every quote operation is scoped to the owning account's email.
pub struct QuoteRepository<S> {
    store: S,
}

impl<S: KeyValueStore> QuoteRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // Users

    pub async fn list_users(&self) -> Result<Vec<StoredUser>, RepositoryError> {
        self.read_collection(USERS_KEY).await
    }

    pub async fn find_user(&self, email: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let email = normalize_email(email);
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .find(|stored| stored.user.email == email))
    }

    /// Registers an account. Emails are unique, compared case-insensitively.
    pub async fn add_user(&self, mut stored: StoredUser) -> Result<(), RepositoryError> {
        stored.user.email = normalize_email(&stored.user.email);
        let mut users = self.list_users().await?;
        if users.iter().any(|u| u.user.email == stored.user.email) {
            return Err(RepositoryError::Duplicate(stored.user.email));
        }

        info!(email = %stored.user.email, role = stored.user.role.as_str(), "registering user");
        users.push(stored);
        self.write_collection(USERS_KEY, &users).await
    }

    pub async fn update_profile(
        &self,
        email: &str,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let email = normalize_email(email);
        let mut users = self.list_users().await?;
        let stored = users
            .iter_mut()
            .find(|stored| stored.user.email == email)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = update.name {
            stored.user.name = name;
        }
        if let Some(commercial_name) = update.commercial_name {
            stored.user.commercial_name = non_empty(commercial_name);
        }
        if let Some(prepared_by) = update.prepared_by {
            stored.user.prepared_by = non_empty(prepared_by);
        }
        let user = stored.to_user();

        self.write_collection(USERS_KEY, &users).await?;
        info!(email = %email, "profile updated");
        Ok(user)
    }

    // Quotes

    /// Quotes saved by `user_email`, newest first.
    pub async fn list_quotes(&self, user_email: &str) -> Result<Vec<SavedQuote>, RepositoryError> {
        let email = normalize_email(user_email);
        let mut quotes: Vec<SavedQuote> = self
            .read_collection::<SavedQuote>(QUOTES_KEY)
            .await?
            .into_iter()
            .filter(|quote| quote.user_email == email)
            .collect();
        quotes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(quotes)
    }

    pub async fn get_quote(&self, id: &str, user_email: &str) -> Result<SavedQuote, RepositoryError> {
        let email = normalize_email(user_email);
        self.read_collection::<SavedQuote>(QUOTES_KEY)
            .await?
            .into_iter()
            .find(|quote| quote.id == id && quote.user_email == email)
            .ok_or(RepositoryError::NotFound)
    }

    /// Inserts the quote, or replaces the same owner's stored quote with the
    /// same id. Another account's quote is never overwritten.
    pub async fn save_quote(&self, quote: &SavedQuote) -> Result<(), RepositoryError> {
        let email = normalize_email(&quote.user_email);
        let mut quotes: Vec<SavedQuote> = self.read_collection(QUOTES_KEY).await?;
        match quotes
            .iter_mut()
            .find(|stored| stored.id == quote.id && stored.user_email == email)
        {
            Some(stored) => *stored = quote.clone(),
            None => quotes.push(quote.clone()),
        }

        self.write_collection(QUOTES_KEY, &quotes).await?;
        info!(
            id = %quote.id,
            user = %quote.user_email,
            items = quote.quote_items.len(),
            total = %quote.total_price,
            "quote saved"
        );
        Ok(())
    }

    pub async fn delete_quote(&self, id: &str, user_email: &str) -> Result<(), RepositoryError> {
        let email = normalize_email(user_email);
        let mut quotes: Vec<SavedQuote> = self.read_collection(QUOTES_KEY).await?;
        let before = quotes.len();
        quotes.retain(|quote| !(quote.id == id && quote.user_email == email));
        if quotes.len() == before {
            return Err(RepositoryError::NotFound);
        }

        self.write_collection(QUOTES_KEY, &quotes).await?;
        info!(id, user = %email, "quote deleted");
        Ok(())
    }

    /// Stamps the quote as ordered at `at`.
    pub async fn mark_ordered(
        &self,
        id: &str,
        user_email: &str,
        at: DateTime<Utc>,
    ) -> Result<SavedQuote, RepositoryError> {
        let email = normalize_email(user_email);
        let mut quotes: Vec<SavedQuote> = self.read_collection(QUOTES_KEY).await?;
        let quote = quotes
            .iter_mut()
            .find(|quote| quote.id == id && quote.user_email == email)
            .ok_or(RepositoryError::NotFound)?;
        quote.ordered_timestamp = Some(at);
        let ordered = quote.clone();

        self.write_collection(QUOTES_KEY, &quotes).await?;
        info!(id, user = %email, "quote marked as ordered");
        Ok(ordered)
    }

    async fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, RepositoryError> {
        let value = self.store.read(key).await.inspect_err(|e| {
            error!(key, "failed to read collection: {}", e);
        })?;
        match value {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                error!(key, "stored collection is not valid: {}", e);
                RepositoryError::Serialization(e.to_string())
            }),
        }
    }

    async fn write_collection<T: Serialize + Sync>(
        &self,
        key: &str,
        items: &[T],
    ) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(items)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.store.write(key, &value).await.inspect_err(|e| {
            error!(key, "failed to write collection: {}", e);
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
