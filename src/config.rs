// Kasa — Configuration
//
// Settings come from a dotenv-style `key=value` file (`.env` by default).
// Every key is optional; a missing file means all defaults.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = ".env";
pub const DEFAULT_DB_PATH: &str = "db/kasa.db";
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(std::io::Error),

    #[error("Malformed config file: {0}")]
    Parse(dotenvy::Error),

    #[error("Invalid value '{value}' for '{key}': {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },
}

/// Which cache tier sits in front of the database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'redis' or 'memory', got '{}'", other)),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis => f.write_str("redis"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sqlite_db_path: PathBuf,
    pub cache: CacheBackend,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sqlite_db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache: CacheBackend::default(),
            redis_host: DEFAULT_REDIS_HOST.to_string(),
            redis_port: DEFAULT_REDIS_PORT,
            redis_db: 0,
        }
    }
}

impl Settings {
    /// Load settings from a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let vars = read_env_file(path)?;
        let settings = Self::from_map(&vars)?;
        tracing::debug!(
            path = %path.display(),
            db = %settings.sqlite_db_path.display(),
            cache = %settings.cache,
            "Configuration loaded"
        );
        Ok(settings)
    }

    /// Build settings from already-parsed `key=value` pairs.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            sqlite_db_path: vars
                .get("sqlite_db_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.sqlite_db_path),
            cache: parse_optional(vars, "cache")?.unwrap_or(defaults.cache),
            redis_host: vars.get("host").cloned().unwrap_or(defaults.redis_host),
            redis_port: parse_optional(vars, "port")?.unwrap_or(defaults.redis_port),
            redis_db: parse_optional(vars, "db")?.unwrap_or(defaults.redis_db),
        })
    }
}

fn parse_optional<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    vars.get(key)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Parse a dotenv-style `key=value` file without touching the process
/// environment.
///
/// Comments, quoting and `export` prefixes follow dotenv syntax. A file
/// that does not exist yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HashMap::new())
        }
        Err(e) => return Err(e.into()),
    };

    iter.collect::<Result<HashMap<_, _>, _>>()
        .map_err(ConfigError::from)
}

impl From<dotenvy::Error> for ConfigError {
    fn from(e: dotenvy::Error) -> Self {
        match e {
            dotenvy::Error::Io(io) => Self::Io(io),
            other => Self::Parse(other),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&dir.path().join("absent.env")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_parses_comments_quotes_and_first_equals() {
        let file = write_config(
            "# comment\n\
             \n\
             sqlite_db_path=\"data/app.db\"\n\
             host='cache.local'\n\
             url=redis://a=b\n",
        );
        let vars = read_env_file(file.path()).unwrap();

        assert_eq!(vars.len(), 3);
        assert_eq!(vars["sqlite_db_path"], "data/app.db");
        assert_eq!(vars["host"], "cache.local");
        assert_eq!(vars["url"], "redis://a=b");
    }

    #[test]
    fn test_export_prefix_and_inline_comment() {
        let file = write_config("export host=cache.local\nport=6380 # redis port\n");
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.redis_host, "cache.local");
        assert_eq!(settings.redis_port, 6380);
    }

    #[test]
    fn test_malformed_line_is_parse_error() {
        let file = write_config("host=h\nnot a pair\n");
        assert!(matches!(
            read_env_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let settings = Settings::from_map(&HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sqlite_db_path, PathBuf::from("db/kasa.db"));
        assert_eq!(settings.redis_port, 6379);
        assert_eq!(settings.cache, CacheBackend::Redis);
    }

    #[test]
    fn test_load_reads_every_key() {
        let file = write_config("sqlite_db_path=x.db\nhost=h\nport=6380\ndb=2\ncache=memory\n");
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.sqlite_db_path, PathBuf::from("x.db"));
        assert_eq!(settings.redis_host, "h");
        assert_eq!(settings.redis_port, 6380);
        assert_eq!(settings.redis_db, 2);
        assert_eq!(settings.cache, CacheBackend::Memory);
    }

    #[test]
    fn test_bad_port_is_invalid() {
        let mut vars = HashMap::new();
        vars.insert("port".to_string(), "sixty".to_string());

        let err = Settings::from_map(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_bad_cache_backend_is_invalid() {
        let mut vars = HashMap::new();
        vars.insert("cache".to_string(), "memcached".to_string());
        assert!(matches!(
            Settings::from_map(&vars),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
