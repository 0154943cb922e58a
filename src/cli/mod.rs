// Kasa — CLI Module
//
// Command-line interface using clap derive macros.
// Groups: salt, cipher, first-salt, cache.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

pub use commands::execute;

/// Kasa — salts and ciphers in SQLite behind a write-through cache.
#[derive(Parser, Debug)]
#[command(name = "kasa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the key=value configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage salt records.
    #[command(subcommand)]
    Salt(SaltCommand),

    /// Manage cipher records.
    #[command(subcommand)]
    Cipher(CipherCommand),

    /// Create and read ciphers keyed by the first salt.
    #[command(subcommand)]
    FirstSalt(FirstSaltCommand),

    /// Cache maintenance.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum SaltCommand {
    /// Create a salt. Omit --value to generate a random one.
    Create {
        #[arg(long, default_value = "sha256")]
        method: String,

        #[arg(long)]
        value: Option<String>,
    },

    /// List all salts.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one salt.
    Get {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Replace a salt's method and value.
    Update {
        id: i64,

        #[arg(long)]
        method: String,

        #[arg(long)]
        value: Option<String>,
    },

    /// Delete a salt by id.
    Delete { id: i64 },

    /// Delete every salt.
    DeleteAll,

    /// Hash a secret with a stored salt.
    Apply {
        id: i64,

        /// The secret to salt. Prefer a throwaway shell to keep it out of history.
        #[arg(long)]
        secret: String,
    },

    /// Create a random salt and apply it to a secret in one step.
    Generate {
        #[arg(long)]
        secret: String,

        #[arg(long, default_value = "sha256")]
        method: String,
    },

    /// List supported hash methods.
    Methods,
}

#[derive(Subcommand, Debug)]
pub enum CipherCommand {
    /// Encrypt and store a plaintext.
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        plaintext: String,

        #[arg(long, default_value = "aes256")]
        method: String,

        #[arg(long)]
        key: String,
    },

    /// List all ciphers (ciphertext only).
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one cipher.
    Get {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Decrypt a cipher with its key.
    Decrypt {
        id: i64,

        #[arg(long)]
        key: String,
    },

    /// Rename or re-encrypt a cipher.
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        plaintext: Option<String>,

        #[arg(long)]
        method: Option<String>,

        /// Required when changing plaintext or method.
        #[arg(long)]
        key: Option<String>,
    },

    /// Delete a cipher by id.
    Delete { id: i64 },

    /// Case-insensitive substring search over names.
    Search { pattern: String },

    /// List id, name and method for ciphers matching a pattern.
    Suggest { pattern: String },

    /// List supported cipher methods.
    Methods,
}

#[derive(Subcommand, Debug)]
pub enum FirstSaltCommand {
    /// Encrypt using the first salt's id as the key.
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        plaintext: String,

        #[arg(long, default_value = "aes256")]
        method: String,
    },

    /// Decrypt a first-salt cipher by id.
    Decrypt { id: i64 },

    /// Decrypt the single cipher whose name contains the pattern.
    DecryptByName { pattern: String },

    /// Delete the single cipher whose name contains the pattern.
    DeleteByName { pattern: String },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Push every stored record into the cache.
    Sync,

    /// Drop everything in the cache database.
    Flush,
}
