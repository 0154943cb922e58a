// Kasa — Service error types
//
// Policy failures of the salt and cipher services. Repository misses are
// `None`; they only become `*NotFound` here when an operation needs the record.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::store::StoreError;

use super::CipherSuggestion;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Malformed ciphertext: {0}")]
    CryptoFormat(String),

    #[error("First salt (id {0}) not found; create a salt first")]
    FirstSaltMissing(i64),

    #[error("Cipher not found: {0}")]
    CipherNotFound(String),

    #[error("Salt not found: {0}")]
    SaltNotFound(i64),

    #[error("{} ciphers match '{pattern}'; be more specific", .suggestions.len())]
    AmbiguousName {
        pattern: String,
        suggestions: Vec<CipherSuggestion>,
    },

    #[error("A key is required when changing plaintext or method")]
    KeyRequired,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<CryptoError> for ServiceError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::UnsupportedMethod(m) => Self::UnsupportedMethod(m),
            CryptoError::Format(reason) => Self::CryptoFormat(reason),
        }
    }
}
