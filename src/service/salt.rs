// Kasa — Salt Service
//
// Creates, reads and applies salt records. Method names arrive as strings
// and are validated here before anything is written.

use serde::Serialize;

use crate::crypto::{HashMethod, SaltHasher};
use crate::store::{CachedRepository, Repository, Salt, Stores};

use super::ServiceError;

/// Outcome of `generate_and_apply`.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSalt {
    pub salt_id: i64,
    pub salted_key: String,
    pub salt: Salt,
}

pub struct SaltService<'a> {
    stores: &'a Stores,
}

impl<'a> SaltService<'a> {
    pub fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    fn repo(&self) -> CachedRepository<'a, Salt> {
        self.stores.repository()
    }

    /// Create a salt record. A missing or empty value is replaced by a random one.
    pub fn create_salt(&self, method: &str, value: Option<String>) -> Result<i64, ServiceError> {
        let method: HashMethod = method.parse()?;
        let (method, salt) = SaltHasher::new(method, value)?.into_parts();

        let id = self.repo().add(&Salt::new(method, salt))?;
        tracing::info!(salt_id = id, method = %method, "Salt created");
        Ok(id)
    }

    pub fn get_salt(&self, id: i64) -> Result<Option<Salt>, ServiceError> {
        Ok(self.repo().get(id)?)
    }

    /// Replace a salt's method and value. Returns false if the salt does not exist.
    pub fn update_salt(
        &self,
        id: i64,
        method: &str,
        value: Option<String>,
    ) -> Result<bool, ServiceError> {
        let method: HashMethod = method.parse()?;
        let (method, salt) = SaltHasher::new(method, value)?.into_parts();

        let updated = self.repo().update(id, &Salt::new(method, salt))?;
        if updated {
            tracing::info!(salt_id = id, method = %method, "Salt updated");
        } else {
            tracing::warn!(salt_id = id, "Attempted to update non-existent salt");
        }
        Ok(updated)
    }

    pub fn delete_salt(&self, id: i64) -> Result<bool, ServiceError> {
        let deleted = self.repo().delete(id)?;
        if deleted {
            tracing::info!(salt_id = id, "Salt deleted");
        } else {
            tracing::warn!(salt_id = id, "Attempted to delete non-existent salt");
        }
        Ok(deleted)
    }

    /// Delete every salt. The next salt created afterwards gets id 1.
    pub fn delete_all_salts(&self) -> Result<usize, ServiceError> {
        let count = self.repo().delete_all()?;
        tracing::info!(count, "All salts deleted");
        Ok(count)
    }

    pub fn list_all_salts(&self) -> Result<Vec<Salt>, ServiceError> {
        Ok(self.repo().list_all()?)
    }

    pub fn supported_methods(&self) -> Vec<&'static str> {
        HashMethod::ALL.iter().map(HashMethod::as_str).collect()
    }

    /// Hex digest of the stored salt value followed by `secret`.
    pub fn apply_salt(&self, salt_id: i64, secret: &str) -> Result<String, ServiceError> {
        let record = self
            .repo()
            .get(salt_id)?
            .ok_or(ServiceError::SaltNotFound(salt_id))?;

        let digest = SaltHasher::new(record.method, Some(record.salt))?.apply(secret)?;
        tracing::debug!(salt_id, "Salt applied");
        Ok(digest)
    }

    /// Create a fresh random salt and immediately apply it to `secret`.
    pub fn generate_and_apply(
        &self,
        secret: &str,
        method: &str,
    ) -> Result<GeneratedSalt, ServiceError> {
        let salt_id = self.create_salt(method, None)?;
        let salted_key = self.apply_salt(salt_id, secret)?;
        let salt = self
            .get_salt(salt_id)?
            .ok_or(ServiceError::SaltNotFound(salt_id))?;

        Ok(GeneratedSalt {
            salt_id,
            salted_key,
            salt,
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
