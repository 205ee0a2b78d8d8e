//! Login state.
//!
//! The logged-in profile (never the password) is kept under
//! [`SESSION_KEY`] in the same store as accounts and quotes, so a session
//! survives restarts until `logout`.

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{KeyValueStore, ProfileUpdate, QuoteRepository, RepositoryError, SESSION_KEY};
use crate::models::User;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are not told apart.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct SessionManager<'a, S> {
    repository: &'a QuoteRepository<S>,
}

impl<'a, S: KeyValueStore> SessionManager<'a, S> {
    pub fn new(repository: &'a QuoteRepository<S>) -> Self {
        Self { repository }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let stored = self
            .repository
            .find_user(email)
            .await?
            .filter(|stored| stored.password_matches(password))
            .ok_or(AuthError::InvalidCredentials)?;

        let user = stored.to_user();
        self.store_session(&user).await?;
        info!(email = %user.email, "logged in");
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.repository.store().remove(SESSION_KEY).await?;
        info!("logged out");
        Ok(())
    }

    /// The logged-in profile, if any.
    ///
    /// A session that cannot be parsed is dropped and treated as logged out.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let Some(value) = self.repository.store().read(SESSION_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_value::<User>(value) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("discarding unreadable session: {}", e);
                self.repository.store().remove(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    pub async fn require_user(&self) -> Result<User, AuthError> {
        self.current_user().await?.ok_or(AuthError::NotLoggedIn)
    }

    /// Updates the logged-in profile and refreshes the session copy.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AuthError> {
        let current = self.require_user().await?;
        let user = self.repository.update_profile(&current.email, update).await?;
        self.store_session(&user).await?;
        Ok(user)
    }

    async fn store_session(&self, user: &User) -> Result<(), AuthError> {
        let value = serde_json::to_value(user)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.repository.store().write(SESSION_KEY, &value).await?;
        Ok(())
    }
}
