// Kasa — Service Module
//
// Salt and cipher operations on top of the two-tier store.

mod cipher;
mod error;
mod salt;

pub use cipher::{
    CipherService, CipherSuggestion, CipherUpdate, FirstSaltCipher, NamedDecryption,
    FIRST_SALT_ID,
};
pub use error::ServiceError;
pub use salt::{GeneratedSalt, SaltService};
