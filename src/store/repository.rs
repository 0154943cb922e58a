// Kasa — Write-Through Repository
//
// Generic CRUD over any `Entity`, with SQLite as the source of truth and the
// cache as a best-effort accelerator:
//   writes : store first, then cache (cache failures are logged, never rolled back)
//   reads  : cache first; on a miss read the store and repopulate the cache
//   lists  : always from the store, repopulating the cache as a side effect
//
// There is no cross-store transaction. Between a store commit and the
// following cache write the two tiers can disagree, and concurrent writers to
// one id can leave the cache holding whichever write reached it last.

use std::marker::PhantomData;

use rusqlite::{params, params_from_iter, OptionalExtension};

use super::cache::{cache_key, CacheStore};
use super::db::Database;
use super::models::{Entity, Fields};
use super::{CacheError, StoreError};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over record persistence for one entity kind.
pub trait Repository<E: Entity> {
    /// Insert a record and return the id the store assigned.
    fn add(&self, entity: &E) -> Result<i64, StoreError>;

    /// Fetch a record by id. A miss is `Ok(None)`, not an error.
    fn get(&self, id: i64) -> Result<Option<E>, StoreError>;

    /// Overwrite the mutable fields of an existing record.
    /// Returns false (and does nothing) if the id is absent.
    fn update(&self, id: i64, entity: &E) -> Result<bool, StoreError>;

    /// Delete a record by id. Returns true if it existed in the store.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// All records, ordered by id.
    fn list_all(&self) -> Result<Vec<E>, StoreError>;

    /// Delete every record of this kind. Returns how many were removed.
    fn delete_all(&self) -> Result<usize, StoreError>;
}

// ─── Cached SQLite Implementation ────────────────────────────────────────────

pub struct CachedRepository<'a, E> {
    db: &'a Database,
    cache: &'a dyn CacheStore,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> CachedRepository<'a, E> {
    pub fn new(db: &'a Database, cache: &'a dyn CacheStore) -> Self {
        Self {
            db,
            cache,
            _entity: PhantomData,
        }
    }

    fn columns() -> String {
        E::COLUMNS.join(", ")
    }

    /// Parse a row of `SELECT id, <columns>` into a field map.
    fn row_to_fields(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fields> {
        let mut fields = Fields::new();
        let id: i64 = row.get(0)?;
        fields.insert("id".to_string(), id.to_string());
        for (i, column) in E::COLUMNS.iter().enumerate() {
            let value: String = row.get(i + 1)?;
            fields.insert(column.to_string(), value);
        }
        Ok(fields)
    }

    /// Read a record straight from the store, bypassing the cache.
    pub fn get_from_store(&self, id: i64) -> Result<Option<E>, StoreError> {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?1",
            Self::columns(),
            E::KIND
        );
        let fields = self
            .db
            .conn()
            .query_row(&sql, params![id], Self::row_to_fields)
            .optional()?;

        fields.as_ref().map(E::from_fields).transpose()
    }

    /// Push every stored record into the cache. Returns the number of records.
    pub fn sync_cache(&self) -> Result<usize, StoreError> {
        let records = self.list_all()?;
        tracing::info!(kind = E::KIND, count = records.len(), "Cache synchronized from store");
        Ok(records.len())
    }

    /// Drop the whole cache database. Unlike the read/write paths, the
    /// failure is returned to the caller.
    pub fn flush_cache(&self) -> Result<(), CacheError> {
        self.cache.flush()?;
        tracing::info!("Cache flushed");
        Ok(())
    }

    /// Best-effort cache write.
    fn cache_put(&self, id: i64, fields: &Fields) {
        let key = cache_key(E::KIND, id);
        if let Err(e) = self.cache.set(&key, fields) {
            tracing::warn!(
                key = %key,
                error = %e,
                "Cache write failed; record will be repopulated on next read"
            );
        }
    }

    /// Best-effort cache eviction.
    fn cache_evict(&self, id: i64) {
        let key = cache_key(E::KIND, id);
        if let Err(e) = self.cache.delete(&key) {
            tracing::warn!(key = %key, error = %e, "Cache eviction failed");
        }
    }

    /// Cache lookup; every failure mode degrades to a miss.
    fn cache_lookup(&self, id: i64) -> Option<E> {
        let key = cache_key(E::KIND, id);
        match self.cache.get(&key) {
            Ok(Some(fields)) => match E::from_fields(&fields) {
                Ok(entity) => {
                    tracing::debug!(key = %key, "Cache hit");
                    Some(entity)
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed; falling back to store");
                None
            }
        }
    }
}

impl<'a, E: Entity> Repository<E> for CachedRepository<'a, E> {
    fn add(&self, entity: &E) -> Result<i64, StoreError> {
        let placeholders: Vec<String> = (1..=E::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::KIND,
            Self::columns(),
            placeholders.join(", ")
        );

        let conn = self.db.conn();
        conn.execute(&sql, params_from_iter(entity.column_values()))?;
        let id = conn.last_insert_rowid();

        let mut fields = entity.to_fields();
        fields.insert("id".to_string(), id.to_string());
        self.cache_put(id, &fields);

        tracing::debug!(kind = E::KIND, id, "Record stored");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<E>, StoreError> {
        if let Some(entity) = self.cache_lookup(id) {
            return Ok(Some(entity));
        }

        let entity = self.get_from_store(id)?;
        if let Some(ref found) = entity {
            self.cache_put(id, &found.to_fields());
            tracing::debug!(kind = E::KIND, id, "Cache repopulated from store");
        }
        Ok(entity)
    }

    fn update(&self, id: i64, entity: &E) -> Result<bool, StoreError> {
        let assignments: Vec<String> = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            E::KIND,
            assignments.join(", "),
            E::COLUMNS.len() + 1
        );

        let tx = self.db.conn().unchecked_transaction()?;
        let exists = tx
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", E::KIND),
                params![id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !exists {
            tracing::debug!(kind = E::KIND, id, "Update skipped; record not in store");
            return Ok(false);
        }

        let mut values = entity.column_values();
        values.push(id.to_string());
        tx.execute(&sql, params_from_iter(values))?;
        tx.commit()?;

        // The write is committed; a failed read-back only costs the cache entry.
        match self.get_from_store(id) {
            Ok(Some(stored)) => self.cache_put(id, &stored.to_fields()),
            Ok(None) => self.cache_evict(id),
            Err(e) => {
                tracing::warn!(
                    kind = E::KIND,
                    id,
                    error = %e,
                    "Read-back after update failed; evicting cache entry"
                );
                self.cache_evict(id);
            }
        }

        tracing::debug!(kind = E::KIND, id, "Record updated");
        Ok(true)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let affected = self.db.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", E::KIND),
            params![id],
        )?;

        self.cache_evict(id);

        if affected > 0 {
            tracing::debug!(kind = E::KIND, id, "Record deleted");
        }
        Ok(affected > 0)
    }

    fn list_all(&self) -> Result<Vec<E>, StoreError> {
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY id ASC",
            Self::columns(),
            E::KIND
        );
        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_fields)?;

        let mut records = Vec::new();
        for row in rows {
            let fields = row?;
            let entity = E::from_fields(&fields)?;
            self.cache_put(entity.id(), &fields);
            records.push(entity);
        }

        Ok(records)
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let tx = self.db.conn().unchecked_transaction()?;
        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(&format!("SELECT id FROM {}", E::KIND))?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };
        tx.execute(&format!("DELETE FROM {}", E::KIND), [])?;
        tx.commit()?;

        for id in &ids {
            self.cache_evict(*id);
        }

        tracing::debug!(kind = E::KIND, count = ids.len(), "All records deleted");
        Ok(ids.len())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
