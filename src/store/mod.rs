// Kasa — Store Module
//
// Two-tier persistence: SQLite is authoritative, a key-value cache (Redis in
// production) is written through on every mutation and filled on read misses.

mod cache;
mod context;
mod db;
mod error;
mod models;
mod repository;

pub use cache::{cache_key, CacheStore, MemoryCache, RedisCache};
pub use context::Stores;
pub use db::Database;
pub use error::{CacheError, StoreError};
pub use models::{Cipher, Entity, Fields, Salt, Session, EXPIRATION_FORMAT};
pub use repository::{CachedRepository, Repository};
