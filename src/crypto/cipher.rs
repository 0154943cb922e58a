// Kasa — Symmetric Cipher Strategies
//
// A fixed registry of symmetric methods selected by name. The caller's key
// string is resized to the method's key length (truncated, or right-padded
// with ASCII '0'); it is never hashed, so keys that agree up to the key
// length are interchangeable.
//
// Token formats:
//   aes128 / aes256: hex(ECB(PKCS#7(plaintext)))
//   chacha20       : hex(nonce) ":" hex(ciphertext)
//
// ECB has no IV: equal plaintext blocks under one key give equal ciphertext
// blocks. Callers that want a stronger construction swap the implementation
// behind `SymmetricCipher`.

use std::fmt;
use std::str::FromStr;

use aes::{Aes128, Aes256};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, ChaCha20Legacy};
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::CryptoError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Byte used to right-pad keys shorter than the method's key length.
const KEY_FILLER: u8 = b'0';

const AES_BLOCK_LEN: usize = 16;

/// IETF ChaCha20 nonce, used for every new token.
const NONCE_LEN: usize = 12;

/// 64-bit nonce of the pre-IETF ChaCha20 variant, accepted on decrypt only.
const LEGACY_NONCE_LEN: usize = 8;

const TOKEN_SEPARATOR: char = ':';

type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;
type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

// ─── Method Registry ─────────────────────────────────────────────────────────

/// The supported symmetric methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherMethod {
    Aes128,
    Aes256,
    ChaCha20,
}

impl CipherMethod {
    pub const ALL: [CipherMethod; 3] = [Self::Aes128, Self::Aes256, Self::ChaCha20];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128 => "aes128",
            Self::Aes256 => "aes256",
            Self::ChaCha20 => "chacha20",
        }
    }

    /// Key length in bytes.
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes256 | Self::ChaCha20 => 32,
        }
    }
}

impl FromStr for CipherMethod {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes128" => Ok(Self::Aes128),
            "aes256" => Ok(Self::Aes256),
            "chacha20" => Ok(Self::ChaCha20),
            _ => Err(CryptoError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CipherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Encrypt/decrypt capability over UTF-8 text.
pub trait SymmetricCipher {
    /// The method this cipher implements.
    fn method(&self) -> CipherMethod;

    /// Encrypt `plaintext` into a method-specific text token.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Recover the plaintext from a token produced by `encrypt`.
    ///
    /// A wrong key surfaces as `CryptoError::Format` for the block modes
    /// (padding check) and usually for ChaCha20 (invalid UTF-8), but a
    /// stream cipher can also return garbage text without any error.
    fn decrypt(&self, token: &str) -> Result<String, CryptoError>;
}

// ─── Encryptor ───────────────────────────────────────────────────────────────

/// A method plus a resized key, dispatching to the concrete cipher.
pub struct Encryptor {
    method: CipherMethod,
    key: Zeroizing<Vec<u8>>,
}

impl Encryptor {
    /// Look up `method_name` (case-insensitive) and bind `key` to it.
    pub fn new(method_name: &str, key: &str) -> Result<Self, CryptoError> {
        let method = method_name.parse::<CipherMethod>()?;
        Ok(Self::with_method(method, key))
    }

    pub fn with_method(method: CipherMethod, key: &str) -> Self {
        Self {
            method,
            key: resize_key(key, method.key_len()),
        }
    }

    fn encrypt_chacha(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let mut buf = plaintext.to_vec();
        ChaCha20::new_from_slices(&self.key, &nonce)
            .map_err(|_| key_length_error(self.method))?
            .apply_keystream(&mut buf);

        Ok(format!(
            "{}{}{}",
            hex::encode(nonce),
            TOKEN_SEPARATOR,
            hex::encode(buf)
        ))
    }

    fn decrypt_chacha(&self, token: &str) -> Result<Vec<u8>, CryptoError> {
        let (nonce_hex, ciphertext_hex) = token
            .trim()
            .split_once(TOKEN_SEPARATOR)
            .ok_or_else(|| {
                CryptoError::Format(format!("expected '<nonce>{}<ciphertext>'", TOKEN_SEPARATOR))
            })?;

        let nonce = decode_hex(nonce_hex, "nonce")?;
        let mut buf = decode_hex(ciphertext_hex, "ciphertext")?;

        match nonce.len() {
            NONCE_LEN => ChaCha20::new_from_slices(&self.key, &nonce)
                .map_err(|_| key_length_error(self.method))?
                .apply_keystream(&mut buf),
            LEGACY_NONCE_LEN => ChaCha20Legacy::new_from_slices(&self.key, &nonce)
                .map_err(|_| key_length_error(self.method))?
                .apply_keystream(&mut buf),
            other => {
                return Err(CryptoError::Format(format!(
                    "nonce must be {} or {} bytes, got {}",
                    NONCE_LEN, LEGACY_NONCE_LEN, other
                )))
            }
        }

        Ok(buf)
    }
}

impl SymmetricCipher for Encryptor {
    fn method(&self) -> CipherMethod {
        self.method
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        match self.method {
            CipherMethod::Aes128 => {
                ecb_encrypt::<Aes128EcbEnc>(self.method, &self.key, plaintext.as_bytes())
            }
            CipherMethod::Aes256 => {
                ecb_encrypt::<Aes256EcbEnc>(self.method, &self.key, plaintext.as_bytes())
            }
            CipherMethod::ChaCha20 => self.encrypt_chacha(plaintext.as_bytes()),
        }
    }

    fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let bytes = match self.method {
            CipherMethod::Aes128 => ecb_decrypt::<Aes128EcbDec>(self.method, &self.key, token)?,
            CipherMethod::Aes256 => ecb_decrypt::<Aes256EcbDec>(self.method, &self.key, token)?,
            CipherMethod::ChaCha20 => self.decrypt_chacha(token)?,
        };

        String::from_utf8(bytes)
            .map_err(|_| CryptoError::Format("decrypted bytes are not valid UTF-8".to_string()))
    }
}

/// Never prints key material.
impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryptor")
            .field("method", &self.method)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ecb_encrypt<E>(method: CipherMethod, key: &[u8], plaintext: &[u8]) -> Result<String, CryptoError>
where
    E: KeyInit + BlockEncryptMut,
{
    let encryptor = E::new_from_slice(key).map_err(|_| key_length_error(method))?;
    Ok(hex::encode(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext)))
}

fn ecb_decrypt<D>(method: CipherMethod, key: &[u8], token: &str) -> Result<Vec<u8>, CryptoError>
where
    D: KeyInit + BlockDecryptMut,
{
    let ciphertext = decode_hex(token.trim(), "ciphertext")?;
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
        return Err(CryptoError::Format(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            AES_BLOCK_LEN
        )));
    }

    D::new_from_slice(key)
        .map_err(|_| key_length_error(method))?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::Format("invalid padding".to_string()))
}

/// Truncate or right-pad the UTF-8 bytes of `key` to exactly `len` bytes.
fn resize_key(key: &str, len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(key.as_bytes().to_vec());
    bytes.truncate(len);
    bytes.resize(len, KEY_FILLER);
    bytes
}

fn decode_hex(s: &str, what: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(s).map_err(|e| CryptoError::Format(format!("invalid hex in {}: {}", what, e)))
}

fn key_length_error(method: CipherMethod) -> CryptoError {
    CryptoError::Format(format!(
        "{} requires a {}-byte key",
        method,
        method.key_len()
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
