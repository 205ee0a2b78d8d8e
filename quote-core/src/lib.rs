pub mod auth;
pub mod builder;
pub mod calculations;
pub mod db;
pub mod ids;
pub mod models;
pub mod saving;

#[cfg(test)]
pub(crate) mod fixtures;

pub use auth::{AuthError, SessionManager};
pub use builder::{BuilderEvent, BuilderState, GateFailure, QuoteBuilder, Step, Transition};
pub use db::repository::{KeyValueStore, QuoteRepository, RepositoryError};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use models::*;
pub use saving::{QuoteDetails, new_saved_quote};
