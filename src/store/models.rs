// Kasa — Record models
//
// Every record kind maps to a flat string field map. The same map is the
// cache representation (one Redis hash per record) and the column set of
// the relational table, so the repository stays generic over `Entity`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{CipherMethod, HashMethod};

use super::StoreError;

/// Flat field map: the cache value and the decoded form of a table row.
pub type Fields = BTreeMap<String, String>;

/// Timestamp layout for session expirations, in the store and in the cache.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A record kind the repository can persist.
pub trait Entity: Sized {
    /// Table name and cache key prefix.
    const KIND: &'static str;

    /// Mutable columns, in table order. `id` is implicit.
    const COLUMNS: &'static [&'static str];

    /// Store-assigned id; `0` until the record has been added.
    fn id(&self) -> i64;

    /// Values for `COLUMNS`, in the same order.
    fn column_values(&self) -> Vec<String>;

    /// Decode a record from its field map (which includes `id`).
    fn from_fields(fields: &Fields) -> Result<Self, StoreError>;

    /// Encode the full record, `id` included.
    fn to_fields(&self) -> Fields {
        let mut fields: Fields = Self::COLUMNS
            .iter()
            .map(|c| c.to_string())
            .zip(self.column_values())
            .collect();
        fields.insert("id".to_string(), self.id().to_string());
        fields
    }
}

fn field<'a, E: Entity>(fields: &'a Fields, name: &str) -> Result<&'a str, StoreError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Corrupt {
            kind: E::KIND,
            reason: format!("missing field '{}'", name),
        })
}

fn id_field<E: Entity>(fields: &Fields) -> Result<i64, StoreError> {
    let raw = field::<E>(fields, "id")?;
    raw.parse().map_err(|_| StoreError::Corrupt {
        kind: E::KIND,
        reason: format!("id '{}' is not an integer", raw),
    })
}

fn corrupt<E: Entity>(reason: impl fmt::Display) -> StoreError {
    StoreError::Corrupt {
        kind: E::KIND,
        reason: reason.to_string(),
    }
}

// ─── Salt ────────────────────────────────────────────────────────────────────

/// A digest method paired with a salt value. The salt with id 1 is the
/// "first salt" that gates first-salt-key ciphers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt {
    pub id: i64,
    pub method: HashMethod,
    pub salt: String,
}

impl Salt {
    pub fn new(method: HashMethod, salt: String) -> Self {
        Self { id: 0, method, salt }
    }
}

impl Entity for Salt {
    const KIND: &'static str = "salt";
    const COLUMNS: &'static [&'static str] = &["method", "salt"];

    fn id(&self) -> i64 {
        self.id
    }

    fn column_values(&self) -> Vec<String> {
        vec![self.method.to_string(), self.salt.clone()]
    }

    fn from_fields(fields: &Fields) -> Result<Self, StoreError> {
        Ok(Self {
            id: id_field::<Self>(fields)?,
            method: field::<Self>(fields, "method")?
                .parse()
                .map_err(corrupt::<Self>)?,
            salt: field::<Self>(fields, "salt")?.to_string(),
        })
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.id, self.method, self.salt)
    }
}

// ─── Cipher ──────────────────────────────────────────────────────────────────

/// Ciphertext plus the method that produced it. The key is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cipher {
    pub id: i64,
    pub name: String,
    pub encrypted_cipher: String,
    pub method: CipherMethod,
}

impl Cipher {
    pub fn new(name: String, encrypted_cipher: String, method: CipherMethod) -> Self {
        Self {
            id: 0,
            name,
            encrypted_cipher,
            method,
        }
    }
}

impl Entity for Cipher {
    const KIND: &'static str = "cipher";
    const COLUMNS: &'static [&'static str] = &["name", "encrypted_cipher", "method"];

    fn id(&self) -> i64 {
        self.id
    }

    fn column_values(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.encrypted_cipher.clone(),
            self.method.to_string(),
        ]
    }

    fn from_fields(fields: &Fields) -> Result<Self, StoreError> {
        Ok(Self {
            id: id_field::<Self>(fields)?,
            name: field::<Self>(fields, "name")?.to_string(),
            encrypted_cipher: field::<Self>(fields, "encrypted_cipher")?.to_string(),
            method: field::<Self>(fields, "method")?
                .parse()
                .map_err(corrupt::<Self>)?,
        })
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id, self.name, self.method)
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// An opaque token with an expiration. Shares the repository pattern with
/// salts and ciphers; no service consumes it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    token: String,
    pub expiration: NaiveDateTime,
}

impl Session {
    pub fn new(token: String, expiration: NaiveDateTime) -> Self {
        Self {
            id: 0,
            token,
            expiration,
        }
    }

    /// A fresh random token valid for `ttl`, expiration truncated to whole seconds.
    pub fn issue(ttl: Duration) -> Self {
        let expiration = (Utc::now() + ttl).naive_utc();
        let expiration = expiration.with_nanosecond(0).unwrap_or(expiration);
        Self::new(uuid::Uuid::new_v4().simple().to_string(), expiration)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().naive_utc() > self.expiration
    }
}

impl Entity for Session {
    const KIND: &'static str = "session";
    const COLUMNS: &'static [&'static str] = &["token", "expiration"];

    fn id(&self) -> i64 {
        self.id
    }

    fn column_values(&self) -> Vec<String> {
        vec![
            self.token.clone(),
            self.expiration.format(EXPIRATION_FORMAT).to_string(),
        ]
    }

    fn from_fields(fields: &Fields) -> Result<Self, StoreError> {
        let raw = field::<Self>(fields, "expiration")?;
        let expiration = NaiveDateTime::parse_from_str(raw, EXPIRATION_FORMAT)
            .map_err(|e| corrupt::<Self>(format!("expiration '{}': {}", raw, e)))?;

        Ok(Self {
            id: id_field::<Self>(fields)?,
            token: field::<Self>(fields, "token")?.to_string(),
            expiration,
        })
    }
}

/// Debug output never includes the token.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_fields_round_trip() {
        let mut salt = Salt::new(HashMethod::Sha512, "abcd".to_string());
        salt.id = 7;

        let fields = salt.to_fields();
        assert_eq!(fields.get("id").map(String::as_str), Some("7"));
        assert_eq!(fields.get("method").map(String::as_str), Some("sha512"));
        assert_eq!(Salt::from_fields(&fields).unwrap(), salt);
    }

    #[test]
    fn test_cipher_fields_round_trip() {
        let mut cipher = Cipher::new("greet".to_string(), "00ff".to_string(), CipherMethod::ChaCha20);
        cipher.id = 3;

        let fields = cipher.to_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields.get("method").map(String::as_str), Some("chacha20"));
        assert_eq!(Cipher::from_fields(&fields).unwrap(), cipher);
    }

    #[test]
    fn test_session_fields_use_expiration_format() {
        let expiration =
            NaiveDateTime::parse_from_str("2030-01-02 03:04:05", EXPIRATION_FORMAT).unwrap();
        let session = Session::new("tok".to_string(), expiration);

        let fields = session.to_fields();
        assert_eq!(
            fields.get("expiration").map(String::as_str),
            Some("2030-01-02 03:04:05")
        );
        assert_eq!(Session::from_fields(&fields).unwrap(), session);
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), "1".to_string());
        fields.insert("method".to_string(), "sha256".to_string());

        let err = Salt::from_fields(&fields).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { kind: "salt", .. }));
    }

    #[test]
    fn test_unknown_method_is_corrupt() {
        let mut fields = Fields::new();
        fields.insert("id".to_string(), "1".to_string());
        fields.insert("name".to_string(), "n".to_string());
        fields.insert("encrypted_cipher".to_string(), "00".to_string());
        fields.insert("method".to_string(), "rot13".to_string());

        assert!(matches!(
            Cipher::from_fields(&fields),
            Err(StoreError::Corrupt { kind: "cipher", .. })
        ));
    }

    #[test]
    fn test_non_integer_id_is_corrupt() {
        let mut salt = Salt::new(HashMethod::Md5, "s".to_string()).to_fields();
        salt.insert("id".to_string(), "one".to_string());
        assert!(Salt::from_fields(&salt).is_err());
    }

    #[test]
    fn test_issued_session_is_live_and_whole_seconds() {
        let session = Session::issue(Duration::hours(1));
        assert!(!session.is_expired());
        assert_eq!(session.expiration.nanosecond(), 0);
        assert_eq!(session.token().len(), 32);

        let expired = Session::issue(Duration::seconds(-5));
        assert!(expired.is_expired());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::issue(Duration::minutes(5));
        let debug = format!("{:?}", session);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(session.token()));
    }

    #[test]
    fn test_cipher_serializes_method_lowercase() {
        let cipher = Cipher::new("n".to_string(), "00".to_string(), CipherMethod::Aes128);
        let json = serde_json::to_string(&cipher).unwrap();
        assert!(json.contains("\"method\":\"aes128\""));
    }
}
