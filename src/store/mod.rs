//! Durable string key/value storage.
//!
//! The post repository keeps its cache and locally created posts as JSON blobs
//! under a handful of fixed keys. Storage is synchronous; callers never hold a
//! value across an await point.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KvStore, StoreError};

/// Key holding the bearer token written by `login`
pub const AUTH_TOKEN_KEY: &str = "auth_token";
