// Kasa — Cipher Service
//
// Encrypts plaintexts into cipher records and recovers them. The key is
// never stored; decryption needs the caller's key or, for the first-salt-key
// protocol, the existence of salt 1.
//
// First-salt-key protocol: the key is the decimal id of the first salt
// ("1"), not the salt's value. The salt record only acts as a gate, so
// anyone who knows the convention can decrypt these ciphers.

use serde::Serialize;

use crate::crypto::{CipherMethod, Encryptor, SymmetricCipher};
use crate::store::{CachedRepository, Cipher, Repository, Stores};

use super::{SaltService, ServiceError};

/// Id of the salt whose existence gates the first-salt-key protocol.
pub const FIRST_SALT_ID: i64 = 1;

/// Characters of ciphertext shown in a suggestion.
const PREVIEW_LEN: usize = 20;

/// Fields to change in `update_cipher`. `None` keeps the current value.
#[derive(Debug, Default, Clone)]
pub struct CipherUpdate {
    pub name: Option<String>,
    pub plaintext: Option<String>,
    pub method: Option<String>,
    pub key: Option<String>,
}

/// Summary of a cipher matching a name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherSuggestion {
    pub id: i64,
    pub name: String,
    pub method: CipherMethod,
    pub encrypted_preview: String,
}

impl From<&Cipher> for CipherSuggestion {
    fn from(cipher: &Cipher) -> Self {
        let mut preview: String = cipher.encrypted_cipher.chars().take(PREVIEW_LEN).collect();
        preview.push_str("...");
        Self {
            id: cipher.id,
            name: cipher.name.clone(),
            method: cipher.method,
            encrypted_preview: preview,
        }
    }
}

/// Outcome of `create_with_first_salt_key`.
#[derive(Debug, Clone, Serialize)]
pub struct FirstSaltCipher {
    pub cipher_id: i64,
    pub salt_id_used: i64,
    pub cipher: Cipher,
}

/// Outcome of `decrypt_by_name_with_first_salt_key`.
#[derive(Debug, Clone)]
pub struct NamedDecryption {
    pub cipher: Cipher,
    pub plaintext: String,
}

pub struct CipherService<'a> {
    stores: &'a Stores,
    salts: SaltService<'a>,
}

impl<'a> CipherService<'a> {
    pub fn new(stores: &'a Stores) -> Self {
        Self {
            stores,
            salts: SaltService::new(stores),
        }
    }

    fn repo(&self) -> CachedRepository<'a, Cipher> {
        self.stores.repository()
    }

    // ─── Keyed Operations ────────────────────────────────────────────────

    /// Encrypt `plaintext` with `method` and `key`, store it and return its id.
    pub fn create_cipher(
        &self,
        name: &str,
        plaintext: &str,
        method: &str,
        key: &str,
    ) -> Result<i64, ServiceError> {
        let encryptor = Encryptor::new(method, key)?;
        let token = encryptor.encrypt(plaintext)?;

        let id = self
            .repo()
            .add(&Cipher::new(name.to_string(), token, encryptor.method()))?;
        tracing::info!(cipher_id = id, name = %name, method = %encryptor.method(), "Cipher created");
        Ok(id)
    }

    /// `create_cipher` followed by a read of the stored record.
    pub fn encrypt_and_store(
        &self,
        name: &str,
        plaintext: &str,
        method: &str,
        key: &str,
    ) -> Result<Cipher, ServiceError> {
        let id = self.create_cipher(name, plaintext, method, key)?;
        self.require_cipher(id)
    }

    pub fn get_cipher(&self, id: i64) -> Result<Option<Cipher>, ServiceError> {
        Ok(self.repo().get(id)?)
    }

    /// Decrypt a stored cipher with the caller's key, using the stored method.
    pub fn decrypt_cipher(&self, id: i64, key: &str) -> Result<String, ServiceError> {
        let cipher = self.require_cipher(id)?;
        let plaintext = Encryptor::with_method(cipher.method, key).decrypt(&cipher.encrypted_cipher)?;
        tracing::debug!(cipher_id = id, "Cipher decrypted");
        Ok(plaintext)
    }

    /// Apply `changes` to a cipher. Returns false if the cipher does not exist.
    ///
    /// A rename alone needs no key. Changing the plaintext or the method (or
    /// passing a key at all) re-encrypts, which requires the key; without a
    /// new plaintext the current one is recovered with that key first.
    pub fn update_cipher(&self, id: i64, changes: CipherUpdate) -> Result<bool, ServiceError> {
        let Some(current) = self.repo().get(id)? else {
            tracing::warn!(cipher_id = id, "Attempted to update non-existent cipher");
            return Ok(false);
        };

        let mut updated = current.clone();
        if let Some(name) = changes.name {
            updated.name = name;
        }

        let reencrypt =
            changes.plaintext.is_some() || changes.method.is_some() || changes.key.is_some();
        if reencrypt {
            let key = changes
                .key
                .filter(|k| !k.is_empty())
                .ok_or(ServiceError::KeyRequired)?;

            let method = match changes.method {
                Some(m) => m.parse::<CipherMethod>()?,
                None => current.method,
            };
            let plaintext = match changes.plaintext {
                Some(p) => p,
                None => Encryptor::with_method(current.method, &key)
                    .decrypt(&current.encrypted_cipher)?,
            };

            updated.encrypted_cipher = Encryptor::with_method(method, &key).encrypt(&plaintext)?;
            updated.method = method;
        }

        let stored = self.repo().update(id, &updated)?;
        if stored {
            tracing::info!(cipher_id = id, reencrypted = reencrypt, "Cipher updated");
        }
        Ok(stored)
    }

    pub fn delete_cipher(&self, id: i64) -> Result<bool, ServiceError> {
        let deleted = self.repo().delete(id)?;
        if deleted {
            tracing::info!(cipher_id = id, "Cipher deleted");
        } else {
            tracing::warn!(cipher_id = id, "Attempted to delete non-existent cipher");
        }
        Ok(deleted)
    }

    pub fn list_all_ciphers(&self) -> Result<Vec<Cipher>, ServiceError> {
        Ok(self.repo().list_all()?)
    }

    pub fn supported_methods(&self) -> Vec<&'static str> {
        CipherMethod::ALL.iter().map(CipherMethod::as_str).collect()
    }

    // ─── Name Search ─────────────────────────────────────────────────────

    /// Case-insensitive substring match over every cipher name.
    pub fn search_by_name(&self, pattern: &str) -> Result<Vec<Cipher>, ServiceError> {
        let needle = pattern.to_lowercase();
        let matches: Vec<Cipher> = self
            .list_all_ciphers()?
            .into_iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect();
        tracing::debug!(pattern = %pattern, matches = matches.len(), "Cipher name search");
        Ok(matches)
    }

    pub fn get_suggestions_by_name(
        &self,
        pattern: &str,
    ) -> Result<Vec<CipherSuggestion>, ServiceError> {
        Ok(self
            .search_by_name(pattern)?
            .iter()
            .map(CipherSuggestion::from)
            .collect())
    }

    /// Resolve a name pattern to exactly one cipher.
    fn resolve_single(&self, pattern: &str) -> Result<Cipher, ServiceError> {
        let mut matches = self.search_by_name(pattern)?;
        match matches.len() {
            0 => {
                tracing::warn!(pattern = %pattern, "No cipher matches name");
                Err(ServiceError::CipherNotFound(format!(
                    "no cipher name contains '{}'",
                    pattern
                )))
            }
            1 => Ok(matches.remove(0)),
            n => {
                tracing::warn!(pattern = %pattern, matches = n, "Cipher name is ambiguous");
                Err(ServiceError::AmbiguousName {
                    pattern: pattern.to_string(),
                    suggestions: matches.iter().map(CipherSuggestion::from).collect(),
                })
            }
        }
    }

    /// Delete the single cipher whose name contains `pattern`.
    pub fn delete_by_name(&self, pattern: &str) -> Result<Cipher, ServiceError> {
        let cipher = self.resolve_single(pattern)?;
        self.delete_cipher(cipher.id)?;
        Ok(cipher)
    }

    // ─── First-Salt-Key Protocol ─────────────────────────────────────────

    /// The key for first-salt-key ciphers, after checking that salt 1 exists.
    fn first_salt_key(&self) -> Result<String, ServiceError> {
        if self.salts.get_salt(FIRST_SALT_ID)?.is_none() {
            tracing::warn!(salt_id = FIRST_SALT_ID, "First salt missing");
            return Err(ServiceError::FirstSaltMissing(FIRST_SALT_ID));
        }
        Ok(FIRST_SALT_ID.to_string())
    }

    pub fn create_with_first_salt_key(
        &self,
        name: &str,
        plaintext: &str,
        method: &str,
    ) -> Result<FirstSaltCipher, ServiceError> {
        let key = self.first_salt_key()?;
        let cipher_id = self.create_cipher(name, plaintext, method, &key)?;
        let cipher = self.require_cipher(cipher_id)?;

        tracing::info!(cipher_id, salt_id = FIRST_SALT_ID, "Cipher created with first salt key");
        Ok(FirstSaltCipher {
            cipher_id,
            salt_id_used: FIRST_SALT_ID,
            cipher,
        })
    }

    pub fn decrypt_with_first_salt_key(&self, cipher_id: i64) -> Result<String, ServiceError> {
        let key = self.first_salt_key()?;
        self.decrypt_cipher(cipher_id, &key)
    }

    /// Decrypt the single cipher whose name contains `pattern` with the
    /// first salt key.
    pub fn decrypt_by_name_with_first_salt_key(
        &self,
        pattern: &str,
    ) -> Result<NamedDecryption, ServiceError> {
        let cipher = self.resolve_single(pattern)?;
        let plaintext = self.decrypt_with_first_salt_key(cipher.id)?;
        tracing::info!(cipher_id = cipher.id, name = %cipher.name, "Cipher decrypted by name");
        Ok(NamedDecryption { cipher, plaintext })
    }

    fn require_cipher(&self, id: i64) -> Result<Cipher, ServiceError> {
        self.repo()
            .get(id)?
            .ok_or_else(|| ServiceError::CipherNotFound(format!("id {}", id)))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
