// Kasa — Store Context
//
// The database and cache are opened once and lent to services. Repositories
// are cheap borrowed views created per call.

use crate::config::{CacheBackend, Settings};

use super::cache::{CacheStore, MemoryCache, RedisCache};
use super::db::Database;
use super::models::Entity;
use super::repository::CachedRepository;
use super::StoreError;

pub struct Stores {
    db: Database,
    cache: Box<dyn CacheStore>,
}

impl Stores {
    pub fn new(db: Database, cache: Box<dyn CacheStore>) -> Self {
        Self { db, cache }
    }

    /// Open the database and build the configured cache backend.
    pub fn open(settings: &Settings) -> Result<Self, StoreError> {
        let db = Database::open(&settings.sqlite_db_path)?;
        let cache: Box<dyn CacheStore> = match settings.cache {
            CacheBackend::Redis => Box::new(RedisCache::new(
                &settings.redis_host,
                settings.redis_port,
                settings.redis_db,
            )?),
            CacheBackend::Memory => Box::new(MemoryCache::new()),
        };

        tracing::info!(
            db = %settings.sqlite_db_path.display(),
            cache = %settings.cache,
            "Stores opened"
        );
        Ok(Self::new(db, cache))
    }

    /// In-memory database with an in-memory cache.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(
            Database::open_in_memory().expect("in-memory database"),
            Box::new(MemoryCache::new()),
        )
    }

    pub fn repository<E: Entity>(&self) -> CachedRepository<'_, E> {
        CachedRepository::new(&self.db, self.cache.as_ref())
    }

    #[cfg(test)]
    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HashMethod;
    use crate::store::models::Salt;
    use crate::store::Repository;

    #[test]
    fn test_open_with_memory_backend() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            sqlite_db_path: dir.path().join("db").join("kasa.db"),
            cache: CacheBackend::Memory,
            ..Settings::default()
        };

        let stores = Stores::open(&settings).unwrap();
        let id = stores
            .repository::<Salt>()
            .add(&Salt::new(HashMethod::Md5, "v".to_string()))
            .unwrap();
        assert!(stores.cache().get("salt:1").unwrap().is_some());
        assert_eq!(id, 1);
        assert!(settings.sqlite_db_path.exists());
    }

    #[test]
    fn test_open_with_unreachable_redis_still_works() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            sqlite_db_path: dir.path().join("kasa.db"),
            cache: CacheBackend::Redis,
            redis_host: "127.0.0.1".to_string(),
            redis_port: 1,
            redis_db: 0,
        };

        let stores = Stores::open(&settings).unwrap();
        let repo = stores.repository::<Salt>();
        let id = repo.add(&Salt::new(HashMethod::Sha256, "v".to_string())).unwrap();
        assert_eq!(repo.get(id).unwrap().unwrap().salt, "v");
    }
}
