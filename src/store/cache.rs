// Kasa — Cache Tier
//
// Key-value cache in front of the relational store. Each record is kept
// under "<kind>:<id>" as its field map. The cache may be flushed, expire or
// disappear at any time; nothing in it is authoritative.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use redis::Commands;

use super::models::Fields;
use super::CacheError;

/// How long a Redis connection attempt may take before the cache is
/// considered unavailable for that operation.
const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Cache key for a record: `"<kind>:<id>"`.
pub fn cache_key(kind: &str, id: i64) -> String {
    format!("{}:{}", kind, id)
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the cache backend.
pub trait CacheStore {
    /// Fetch the field map stored at `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Fields>, CacheError>;

    /// Replace whatever is stored at `key` with `fields`.
    fn set(&self, key: &str, fields: &Fields) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drop every entry in the cache database.
    fn flush(&self) -> Result<(), CacheError>;
}

// ─── Redis Implementation ────────────────────────────────────────────────────

/// Redis-backed cache storing each record as a hash.
///
/// A connection is opened per operation, so a Redis outage only shows up as
/// `CacheError` on the calls made while it lasts.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Build a client for `redis://host:port/db`. Does not connect.
    pub fn new(host: &str, port: u16, db: i64) -> Result<Self, CacheError> {
        let client = redis::Client::open(format!("redis://{}:{}/{}", host, port, db))?;
        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, CacheError> {
        Ok(self
            .client
            .get_connection_with_timeout(REDIS_CONNECT_TIMEOUT)?)
    }
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> Result<Option<Fields>, CacheError> {
        let mut con = self.connection()?;
        let fields: Fields = con.hgetall(key)?;
        Ok(if fields.is_empty() { None } else { Some(fields) })
    }

    fn set(&self, key: &str, fields: &Fields) -> Result<(), CacheError> {
        let mut con = self.connection()?;
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .hset_multiple(key, &items[..])
            .ignore()
            .query::<()>(&mut con)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut con = self.connection()?;
        con.del::<_, ()>(key)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut con = self.connection()?;
        redis::cmd("FLUSHDB").query::<()>(&mut con)?;
        Ok(())
    }
}

// ─── In-Memory Implementation ────────────────────────────────────────────────

/// Process-local cache. Used when no Redis server is configured, and by tests.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Fields>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Fields>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, fields: &Fields) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), fields.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }
}

// ─── Test Doubles ────────────────────────────────────────────────────────────

/// Caches that fail on demand, for exercising the non-fatal cache paths.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Every operation fails, as if the cache server were down.
    pub struct UnavailableCache;

    impl CacheStore for UnavailableCache {
        fn get(&self, _key: &str) -> Result<Option<Fields>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        fn set(&self, _key: &str, _fields: &Fields) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        fn flush(&self) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }
    }

    /// A memory cache that can be taken offline and brought back.
    pub struct SwitchableCache {
        inner: MemoryCache,
        online: AtomicBool,
    }

    impl SwitchableCache {
        pub fn new() -> Self {
            Self {
                inner: MemoryCache::new(),
                online: AtomicBool::new(true),
            }
        }

        pub fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        pub fn contains(&self, key: &str) -> bool {
            self.inner.contains(key)
        }

        fn check(&self) -> Result<(), CacheError> {
            if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(CacheError::Unavailable("switched off".to_string()))
            }
        }
    }

    impl CacheStore for SwitchableCache {
        fn get(&self, key: &str) -> Result<Option<Fields>, CacheError> {
            self.check()?;
            self.inner.get(key)
        }

        fn set(&self, key: &str, fields: &Fields) -> Result<(), CacheError> {
            self.check()?;
            self.inner.set(key, fields)
        }

        fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.check()?;
            self.inner.delete(key)
        }

        fn flush(&self) -> Result<(), CacheError> {
            self.check()?;
            self.inner.flush()
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> Fields {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), "1".to_string());
        fields.insert("method".to_string(), "sha256".to_string());
        fields
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("salt", 1), "salt:1");
        assert_eq!(cache_key("cipher", 42), "cipher:42");
    }

    #[test]
    fn test_memory_cache_set_get_delete() {
        let cache = MemoryCache::new();
        assert!(cache.get("salt:1").unwrap().is_none());

        cache.set("salt:1", &sample_fields()).unwrap();
        assert_eq!(cache.get("salt:1").unwrap(), Some(sample_fields()));

        cache.delete("salt:1").unwrap();
        assert!(cache.get("salt:1").unwrap().is_none());
    }

    #[test]
    fn test_memory_cache_delete_absent_key_is_ok() {
        let cache = MemoryCache::new();
        assert!(cache.delete("cipher:99").is_ok());
    }

    #[test]
    fn test_memory_cache_set_replaces_whole_record() {
        let cache = MemoryCache::new();
        cache.set("salt:1", &sample_fields()).unwrap();

        let mut replacement = Fields::new();
        replacement.insert("id".to_string(), "1".to_string());
        cache.set("salt:1", &replacement).unwrap();

        assert_eq!(cache.get("salt:1").unwrap(), Some(replacement));
    }

    #[test]
    fn test_memory_cache_flush() {
        let cache = MemoryCache::new();
        cache.set("salt:1", &sample_fields()).unwrap();
        cache.set("cipher:1", &sample_fields()).unwrap();
        assert_eq!(cache.len(), 2);

        cache.flush().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_switchable_cache_goes_offline() {
        let cache = mock::SwitchableCache::new();
        cache.set("salt:1", &sample_fields()).unwrap();

        cache.set_online(false);
        assert!(matches!(cache.get("salt:1"), Err(CacheError::Unavailable(_))));

        cache.set_online(true);
        assert!(cache.get("salt:1").unwrap().is_some());
    }

    #[test]
    fn test_redis_cache_unreachable_server_is_an_error() {
        // Port 1 on loopback refuses connections.
        let cache = RedisCache::new("127.0.0.1", 1, 0).unwrap();
        assert!(cache.get("salt:1").is_err());
        assert!(cache.set("salt:1", &sample_fields()).is_err());
        assert!(cache.delete("salt:1").is_err());
    }
}
