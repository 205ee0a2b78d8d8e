pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{DbConfig, StoreFactory, StoreRegistry};
pub use memory::{MemoryStore, MemoryStoreFactory};
pub use repository::{
    KeyValueStore, ProfileUpdate, QUOTES_KEY, QuoteRepository, RepositoryError, SESSION_KEY,
    USERS_KEY,
};
