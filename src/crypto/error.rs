// Kasa — Crypto error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Malformed ciphertext: {0}")]
    Format(String),
}
