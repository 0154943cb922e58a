// Kasa — Salted Digests
//
// A salt pairs a digest method with a (usually random) string. Applying it
// hashes `salt || secret` and returns the hex digest. Argon2 is part of the
// accepted method set but has no hashing path; constructing a hasher for it
// fails instead of quietly using another digest.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::CryptoError;

/// Number of random bytes in a generated salt (hex-encoded to twice as many chars).
pub const DEFAULT_SALT_BYTES: usize = 16;

/// Digest methods a salt record may name.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMethod {
    #[default]
    Sha256,
    Sha512,
    Md5,
    Argon2,
}

impl HashMethod {
    pub const ALL: [HashMethod; 4] = [Self::Sha256, Self::Sha512, Self::Md5, Self::Argon2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
            Self::Argon2 => "argon2",
        }
    }
}

impl FromStr for HashMethod {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            "argon2" => Ok(Self::Argon2),
            _ => Err(CryptoError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A validated (method, salt value) pair that can digest secrets.
#[derive(Debug, Clone)]
pub struct SaltHasher {
    method: HashMethod,
    salt: String,
}

impl SaltHasher {
    /// Build a hasher, generating a random salt when `salt` is `None` or empty.
    pub fn new(method: HashMethod, salt: Option<String>) -> Result<Self, CryptoError> {
        if method == HashMethod::Argon2 {
            return Err(CryptoError::UnsupportedMethod(
                "argon2 (declared but no hashing implementation is available)".to_string(),
            ));
        }

        let salt = match salt {
            Some(s) if !s.is_empty() => s,
            _ => generate_salt(DEFAULT_SALT_BYTES),
        };

        Ok(Self { method, salt })
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn into_parts(self) -> (HashMethod, String) {
        (self.method, self.salt)
    }

    /// Hex digest of `salt || secret`.
    pub fn apply(&self, secret: &str) -> Result<String, CryptoError> {
        let input = [self.salt.as_bytes(), secret.as_bytes()].concat();
        match self.method {
            HashMethod::Sha256 => Ok(hex::encode(Sha256::digest(&input))),
            HashMethod::Sha512 => Ok(hex::encode(Sha512::digest(&input))),
            HashMethod::Md5 => Ok(hex::encode(Md5::digest(&input))),
            HashMethod::Argon2 => Err(CryptoError::UnsupportedMethod(self.method.to_string())),
        }
    }
}

/// `len` random bytes, hex-encoded.
fn generate_salt(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_salt_is_32_hex_chars() {
        let hasher = SaltHasher::new(HashMethod::Sha256, None).unwrap();
        assert_eq!(hasher.salt().len(), DEFAULT_SALT_BYTES * 2);
        assert!(hasher.salt().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_salts_differ() {
        let a = SaltHasher::new(HashMethod::Sha256, None).unwrap();
        let b = SaltHasher::new(HashMethod::Sha256, None).unwrap();
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn test_empty_salt_value_is_replaced() {
        let hasher = SaltHasher::new(HashMethod::Md5, Some(String::new())).unwrap();
        assert_eq!(hasher.salt().len(), DEFAULT_SALT_BYTES * 2);
    }

    #[test]
    fn test_caller_supplied_salt_is_kept() {
        let hasher = SaltHasher::new(HashMethod::Sha512, Some("pepper".to_string())).unwrap();
        assert_eq!(hasher.salt(), "pepper");
    }

    #[test]
    fn test_sha256_known_digest() {
        // sha256("abc")
        let hasher = SaltHasher::new(HashMethod::Sha256, Some("a".to_string())).unwrap();
        assert_eq!(
            hasher.apply("bc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_md5_known_digest() {
        // md5("abc")
        let hasher = SaltHasher::new(HashMethod::Md5, Some("ab".to_string())).unwrap();
        assert_eq!(hasher.apply("c").unwrap(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_digest_lengths() {
        for (method, hex_len) in [
            (HashMethod::Sha256, 64),
            (HashMethod::Sha512, 128),
            (HashMethod::Md5, 32),
        ] {
            let hasher = SaltHasher::new(method, None).unwrap();
            assert_eq!(hasher.apply("poqob").unwrap().len(), hex_len, "{}", method);
        }
    }

    #[test]
    fn test_same_salt_same_digest() {
        let a = SaltHasher::new(HashMethod::Sha256, Some("s".to_string())).unwrap();
        let b = SaltHasher::new(HashMethod::Sha256, Some("s".to_string())).unwrap();
        assert_eq!(a.apply("secret").unwrap(), b.apply("secret").unwrap());
        assert_ne!(a.apply("secret").unwrap(), a.apply("other").unwrap());
    }

    #[test]
    fn test_argon2_fails_at_construction() {
        assert_eq!("argon2".parse::<HashMethod>().unwrap(), HashMethod::Argon2);
        let err = SaltHasher::new(HashMethod::Argon2, None).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(matches!(
            "blake3".parse::<HashMethod>(),
            Err(CryptoError::UnsupportedMethod(_))
        ));
        assert_eq!("SHA512".parse::<HashMethod>().unwrap(), HashMethod::Sha512);
    }

    #[test]
    fn test_all_methods_listed() {
        let names: Vec<&str> = HashMethod::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["sha256", "sha512", "md5", "argon2"]);
    }
}
