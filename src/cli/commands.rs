// Kasa — CLI Command Handlers
//
// Each function handles one CLI subcommand. Settings are loaded and the
// stores opened once per invocation; handlers borrow them through the
// services. Plaintexts are printed only by the decrypt commands.

use serde::Serialize;

use crate::config::Settings;
use crate::error::KasaError;
use crate::service::{CipherService, CipherUpdate, SaltService, ServiceError};
use crate::store::{Cipher, Entity, Salt, Session, Stores};

use super::{CacheCommand, CipherCommand, Cli, Commands, FirstSaltCommand, SaltCommand};

/// Execute the parsed CLI command.
pub fn execute(cli: Cli) -> Result<(), KasaError> {
    let settings = Settings::load(&cli.config)?;
    let stores = Stores::open(&settings)?;
    run(cli.command, &stores)
}

/// Dispatch a command against already-open stores.
pub(crate) fn run(command: Commands, stores: &Stores) -> Result<(), KasaError> {
    match command {
        Commands::Salt(cmd) => run_salt(cmd, &SaltService::new(stores)),
        Commands::Cipher(cmd) => run_cipher(cmd, &CipherService::new(stores)),
        Commands::FirstSalt(cmd) => run_first_salt(cmd, &CipherService::new(stores)),
        Commands::Cache(cmd) => run_cache(cmd, stores),
    }
}

// ─── Salt ────────────────────────────────────────────────────────────────────

fn run_salt(cmd: SaltCommand, service: &SaltService<'_>) -> Result<(), KasaError> {
    match cmd {
        SaltCommand::Create { method, value } => {
            let id = service.create_salt(&method, value)?;
            println!("✓ Salt created");
            println!("  ID:     {}", id);
            println!("  Method: {}", method.to_lowercase());
        }
        SaltCommand::List { json } => {
            let salts = service.list_all_salts()?;
            if json {
                print_json(&salts)?;
            } else if salts.is_empty() {
                println!("No salts stored yet.");
                println!("Create one with: kasa salt create --method sha256");
            } else {
                println!("Stored salts ({}):\n", salts.len());
                for salt in &salts {
                    println!("  {:>4} │ {:8} │ {}", salt.id, salt.method, salt.salt);
                }
            }
        }
        SaltCommand::Get { id, json } => match service.get_salt(id)? {
            Some(salt) if json => print_json(&salt)?,
            Some(salt) => {
                println!("Salt details:\n");
                println!("  ID:     {}", salt.id);
                println!("  Method: {}", salt.method);
                println!("  Salt:   {}", salt.salt);
            }
            None => println!("Salt not found: {}", id),
        },
        SaltCommand::Update { id, method, value } => {
            if service.update_salt(id, &method, value)? {
                println!("✓ Salt {} updated", id);
            } else {
                println!("Salt not found: {}", id);
            }
        }
        SaltCommand::Delete { id } => {
            if service.delete_salt(id)? {
                println!("✓ Salt {} deleted", id);
            } else {
                println!("Salt not found: {}", id);
            }
        }
        SaltCommand::DeleteAll => {
            let count = service.delete_all_salts()?;
            println!("✓ Deleted {} salt(s)", count);
        }
        SaltCommand::Apply { id, secret } => {
            println!("{}", service.apply_salt(id, &secret)?);
        }
        SaltCommand::Generate { secret, method } => {
            let generated = service.generate_and_apply(&secret, &method)?;
            println!("✓ Salt generated and applied");
            println!("  Salt ID:    {}", generated.salt_id);
            println!("  Method:     {}", generated.salt.method);
            println!("  Salt:       {}", generated.salt.salt);
            println!("  Salted key: {}", generated.salted_key);
        }
        SaltCommand::Methods => print_methods(&service.supported_methods()),
    }
    Ok(())
}

// ─── Cipher ──────────────────────────────────────────────────────────────────

fn run_cipher(cmd: CipherCommand, service: &CipherService<'_>) -> Result<(), KasaError> {
    match cmd {
        CipherCommand::Create {
            name,
            plaintext,
            method,
            key,
        } => {
            let cipher = service.encrypt_and_store(&name, &plaintext, &method, &key)?;
            println!("✓ Cipher stored");
            println!("  ID:     {}", cipher.id);
            println!("  Name:   {}", cipher.name);
            println!("  Method: {}", cipher.method);
        }
        CipherCommand::List { json } => {
            let ciphers = service.list_all_ciphers()?;
            if json {
                print_json(&ciphers)?;
            } else if ciphers.is_empty() {
                println!("No ciphers stored yet.");
            } else {
                print_cipher_table(&ciphers);
            }
        }
        CipherCommand::Get { id, json } => match service.get_cipher(id)? {
            Some(cipher) if json => print_json(&cipher)?,
            Some(cipher) => {
                println!("Cipher details:\n");
                println!("  ID:         {}", cipher.id);
                println!("  Name:       {}", cipher.name);
                println!("  Method:     {}", cipher.method);
                println!("  Ciphertext: {}", cipher.encrypted_cipher);
            }
            None => println!("Cipher not found: {}", id),
        },
        CipherCommand::Decrypt { id, key } => {
            println!("{}", service.decrypt_cipher(id, &key)?);
        }
        CipherCommand::Update {
            id,
            name,
            plaintext,
            method,
            key,
        } => {
            let changes = CipherUpdate {
                name,
                plaintext,
                method,
                key,
            };
            if service.update_cipher(id, changes)? {
                println!("✓ Cipher {} updated", id);
            } else {
                println!("Cipher not found: {}", id);
            }
        }
        CipherCommand::Delete { id } => {
            if service.delete_cipher(id)? {
                println!("✓ Cipher {} deleted", id);
            } else {
                println!("Cipher not found: {}", id);
            }
        }
        CipherCommand::Search { pattern } => {
            let matches = service.search_by_name(&pattern)?;
            if matches.is_empty() {
                println!("No ciphers match '{}'.", pattern);
            } else {
                print_cipher_table(&matches);
            }
        }
        CipherCommand::Suggest { pattern } => {
            let suggestions = service.get_suggestions_by_name(&pattern)?;
            if suggestions.is_empty() {
                println!("No ciphers match '{}'.", pattern);
            }
            for s in &suggestions {
                println!("  {:>4} │ {:8} │ {:24} │ {}", s.id, s.method, s.name, s.encrypted_preview);
            }
        }
        CipherCommand::Methods => print_methods(&service.supported_methods()),
    }
    Ok(())
}

// ─── First Salt ──────────────────────────────────────────────────────────────

fn run_first_salt(cmd: FirstSaltCommand, service: &CipherService<'_>) -> Result<(), KasaError> {
    match cmd {
        FirstSaltCommand::Create {
            name,
            plaintext,
            method,
        } => {
            let created = service.create_with_first_salt_key(&name, &plaintext, &method)?;
            println!("✓ Cipher stored with first salt key");
            println!("  ID:      {}", created.cipher_id);
            println!("  Name:    {}", created.cipher.name);
            println!("  Method:  {}", created.cipher.method);
            println!("  Salt ID: {}", created.salt_id_used);
        }
        FirstSaltCommand::Decrypt { id } => {
            println!("{}", service.decrypt_with_first_salt_key(id)?);
        }
        FirstSaltCommand::DecryptByName { pattern } => {
            let found = service
                .decrypt_by_name_with_first_salt_key(&pattern)
                .inspect_err(print_suggestions)?;
            println!("{}", found.plaintext);
        }
        FirstSaltCommand::DeleteByName { pattern } => {
            let deleted = service
                .delete_by_name(&pattern)
                .inspect_err(print_suggestions)?;
            println!("✓ Cipher {} ({}) deleted", deleted.id, deleted.name);
        }
    }
    Ok(())
}

// ─── Cache ───────────────────────────────────────────────────────────────────

fn run_cache(cmd: CacheCommand, stores: &Stores) -> Result<(), KasaError> {
    match cmd {
        CacheCommand::Sync => {
            let salts = stores.repository::<Salt>().sync_cache()?;
            let ciphers = stores.repository::<Cipher>().sync_cache()?;
            let sessions = stores.repository::<Session>().sync_cache()?;
            println!("✓ Cache synchronized");
            println!("  {:8} {}", Salt::KIND, salts);
            println!("  {:8} {}", Cipher::KIND, ciphers);
            println!("  {:8} {}", Session::KIND, sessions);
        }
        CacheCommand::Flush => {
            stores.repository::<Salt>().flush_cache()?;
            println!("✓ Cache flushed");
        }
    }
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), KasaError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_methods(methods: &[&str]) {
    for method in methods {
        println!("{}", method);
    }
}

/// On an ambiguous name, list the candidates so the user can pick one.
fn print_suggestions(err: &ServiceError) {
    if let ServiceError::AmbiguousName { suggestions, .. } = err {
        eprintln!("Matching ciphers:");
        for s in suggestions {
            eprintln!("  {:>4} │ {:8} │ {}", s.id, s.method, s.name);
        }
    }
}

fn print_cipher_table(ciphers: &[Cipher]) {
    println!("Ciphers ({}):\n", ciphers.len());
    for cipher in ciphers {
        println!("  {:>4} │ {:8} │ {}", cipher.id, cipher.method, cipher.name);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Repository;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["kasa"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_first_salt_flow_through_commands() {
        let stores = Stores::in_memory();

        let err = run(
            parse(&["first-salt", "create", "--name", "greet", "--plaintext", "hi"]),
            &stores,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            KasaError::Service(ServiceError::FirstSaltMissing(1))
        ));

        run(parse(&["salt", "create"]), &stores).unwrap();
        run(
            parse(&["first-salt", "create", "--name", "greet", "--plaintext", "hi"]),
            &stores,
        )
        .unwrap();
        run(parse(&["first-salt", "decrypt", "1"]), &stores).unwrap();
        run(parse(&["first-salt", "decrypt-by-name", "gre"]), &stores).unwrap();
        run(parse(&["first-salt", "delete-by-name", "greet"]), &stores).unwrap();

        assert!(CipherService::new(&stores).list_all_ciphers().unwrap().is_empty());
    }

    #[test]
    fn test_cipher_update_without_key_is_error() {
        let stores = Stores::in_memory();
        run(
            parse(&["cipher", "create", "--name", "n", "--plaintext", "p", "--key", "k"]),
            &stores,
        )
        .unwrap();

        let err = run(parse(&["cipher", "update", "1", "--plaintext", "q"]), &stores).unwrap_err();
        assert!(matches!(err, KasaError::Service(ServiceError::KeyRequired)));

        run(parse(&["cipher", "update", "1", "--name", "renamed"]), &stores).unwrap();
        let cipher = CipherService::new(&stores).get_cipher(1).unwrap().unwrap();
        assert_eq!(cipher.name, "renamed");
    }

    #[test]
    fn test_cache_sync_and_flush() {
        let stores = Stores::in_memory();
        run(parse(&["salt", "create", "--method", "md5"]), &stores).unwrap();

        run(parse(&["cache", "flush"]), &stores).unwrap();
        assert!(stores.cache().get("salt:1").unwrap().is_none());

        run(parse(&["cache", "sync"]), &stores).unwrap();
        assert!(stores.cache().get("salt:1").unwrap().is_some());
    }

    #[test]
    fn test_listing_commands_succeed_on_empty_store() {
        let stores = Stores::in_memory();
        for args in [
            &["salt", "list"][..],
            &["salt", "list", "--json"][..],
            &["salt", "get", "3"][..],
            &["cipher", "list", "--json"][..],
            &["cipher", "search", "x"][..],
            &["cipher", "suggest", "x"][..],
            &["cipher", "methods"][..],
            &["salt", "methods"][..],
        ] {
            run(parse(args), &stores).unwrap();
        }
    }

    #[test]
    fn test_execute_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("kasa.env");
        let db = dir.path().join("data").join("kasa.db");
        std::fs::write(
            &config,
            format!("sqlite_db_path={}\ncache=memory\n", db.display()),
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "kasa",
            "--config",
            config.to_str().unwrap(),
            "salt",
            "create",
            "--value",
            "abc",
        ])
        .unwrap();
        execute(cli).unwrap();

        let settings = Settings::load(&config).unwrap();
        let stores = Stores::open(&settings).unwrap();
        let salt = stores.repository::<Salt>().get(1).unwrap().unwrap();
        assert_eq!(salt.salt, "abc");
    }
}
