// Kasa — Library root
//
// Re-exports the crypto, store, service, config and CLI modules.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod service;
pub mod store;

pub use error::{KasaError, Result};
