//! Process configuration read from environment variables.
//!
//! | Variable             | Default                  |
//! |----------------------|--------------------------|
//! | `HOST` / `PORT`      | `0.0.0.0` / `3001`       |
//! | `JWT_SECRET`         | insecure dev default     |
//! | `CACHE_ENABLED`      | `false`                  |
//! | `CACHE_BACKEND`      | `memory` (`redis`)       |
//! | `REDIS_URL`          | `redis://localhost:6379` |
//! | `STORAGE_BACKEND`    | `memory` (`json`, `postgres`, `document`) |
//! | `DATA_DIR`           | `./data`                 |
//! | `DATABASE_URL`       | required for `postgres` / `document` |
//! | `BACKEND_TIMEOUT_MS` | `3000`                   |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be set when {when}")]
    Missing { var: &'static str, when: String },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_owned(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    Json,
    Postgres,
    Document,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Json => "json",
            StorageBackend::Postgres => "postgres",
            StorageBackend::Document => "document",
        }
    }

    pub fn needs_database(self) -> bool {
        matches!(self, StorageBackend::Postgres | StorageBackend::Document)
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" => Ok(Self::Json),
            "postgres" => Ok(Self::Postgres),
            "document" => Ok(Self::Document),
            _ => Err("expected memory, json, postgres or document".to_string()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err("expected memory or redis".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cache_enabled: bool,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub backend_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            cache_enabled: false,
            cache_backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            storage_backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            database_url: None,
            backend_timeout: crate::repository::DEFAULT_BACKEND_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(host) = get("HOST") {
            settings.host = host;
        }
        if let Some(port) = get("PORT") {
            settings.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", &port, "expected a port number"))?;
        }
        match get("JWT_SECRET") {
            Some(secret) => settings.jwt_secret = secret,
            None => tracing::warn!("JWT_SECRET not set; using insecure dev default"),
        }
        if let Some(enabled) = get("CACHE_ENABLED") {
            settings.cache_enabled = parse_bool("CACHE_ENABLED", &enabled)?;
        }
        if let Some(backend) = get("CACHE_BACKEND") {
            settings.cache_backend = backend
                .parse()
                .map_err(|reason: String| ConfigError::invalid("CACHE_BACKEND", &backend, reason))?;
        }
        if let Some(url) = get("REDIS_URL") {
            settings.redis_url = url;
        }
        if let Some(backend) = get("STORAGE_BACKEND") {
            settings.storage_backend = backend.parse().map_err(|reason: String| {
                ConfigError::invalid("STORAGE_BACKEND", &backend, reason)
            })?;
        }
        if let Some(dir) = get("DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        settings.database_url = get("DATABASE_URL");
        if let Some(ms) = get("BACKEND_TIMEOUT_MS") {
            let millis: u64 = ms.trim().parse().map_err(|_| {
                ConfigError::invalid("BACKEND_TIMEOUT_MS", &ms, "expected milliseconds")
            })?;
            if millis == 0 {
                return Err(ConfigError::invalid(
                    "BACKEND_TIMEOUT_MS",
                    &ms,
                    "must be greater than zero",
                ));
            }
            settings.backend_timeout = Duration::from_millis(millis);
        }

        if settings.storage_backend.needs_database() && settings.database_url.is_none() {
            return Err(ConfigError::Missing {
                var: "DATABASE_URL",
                when: format!("STORAGE_BACKEND={}", settings.storage_backend.as_str()),
            });
        }

        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    pub fn teams_dir(&self) -> PathBuf {
        self.data_dir.join("teams")
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(var, raw, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.bind_addr(), "0.0.0.0:3001");
        assert_eq!(settings.users_dir(), PathBuf::from("./data/users"));
        assert!(!settings.cache_enabled);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = load(&[
            ("PORT", "8080"),
            ("CACHE_ENABLED", "true"),
            ("CACHE_BACKEND", "Redis"),
            ("STORAGE_BACKEND", "json"),
            ("DATA_DIR", "/tmp/roster"),
            ("BACKEND_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert!(settings.cache_enabled);
        assert_eq!(settings.cache_backend, CacheBackend::Redis);
        assert_eq!(settings.storage_backend, StorageBackend::Json);
        assert_eq!(settings.teams_dir(), PathBuf::from("/tmp/roster/teams"));
        assert_eq!(settings.backend_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            ("PORT", "eighty"),
            ("CACHE_ENABLED", "maybe"),
            ("CACHE_BACKEND", "memcached"),
            ("STORAGE_BACKEND", "mongo"),
            ("BACKEND_TIMEOUT_MS", "0"),
        ] {
            let err = load(&[(var, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { var: v, .. } if *v == var),
                "{var}={value}: {err}"
            );
        }
    }

    #[test]
    fn database_backends_require_a_url() {
        let err = load(&[("STORAGE_BACKEND", "postgres")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "DATABASE_URL", .. }));

        let settings = load(&[
            ("STORAGE_BACKEND", "document"),
            ("DATABASE_URL", "postgres://localhost/roster"),
        ])
        .unwrap();
        assert_eq!(settings.storage_backend, StorageBackend::Document);
    }
}
