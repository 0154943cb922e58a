// Kasa — Crypto Module
//
// Symmetric cipher strategies (AES-128/256 in ECB mode, ChaCha20) and the
// salted digest helper. Everything here is a pure data transform; nothing
// touches the stores.

mod cipher;
mod error;
mod salt;

pub use cipher::{CipherMethod, Encryptor, SymmetricCipher};
pub use error::CryptoError;
pub use salt::{HashMethod, SaltHasher, DEFAULT_SALT_BYTES};
