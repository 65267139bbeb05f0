/// Configuration management for Interaction Service
///
/// Loads configuration from environment variables (a `.env` file is honoured
/// by the binary before this runs).
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Record store configuration
    pub store: StoreConfig,
    /// Feed composition limits
    pub feed: FeedConfig,
    /// Post deletion behaviour
    pub cascade: CascadeConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// `json` for structured log lines, anything else for human-readable output
    pub log_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database URL, required for the postgres backend
    pub database_url: Option<String>,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page size when the caller does not pass one
    #[serde(default = "default_feed_limit")]
    pub default_limit: usize,
    /// Upper bound for the recency window
    #[serde(default = "default_feed_max_limit")]
    pub max_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Delete a post's comments together with the post. Off by default, which
    /// leaves those comments orphaned.
    #[serde(default)]
    pub purge_comments: bool,
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_feed_limit() -> usize {
    20
}

fn default_feed_max_limit() -> usize {
    100
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_feed_max_limit(),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_parse("PORT").unwrap_or(8010),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
        };

        let backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres,
            other => bail!("unsupported STORE_BACKEND: {}", other),
        };

        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL environment variable not set");
        }

        let store = StoreConfig {
            backend,
            database_url,
            max_connections: env_parse("DB_MAX_CONNECTIONS")
                .unwrap_or_else(default_max_connections),
            min_connections: env_parse("DB_MIN_CONNECTIONS")
                .unwrap_or_else(default_min_connections),
        };

        let feed = FeedConfig {
            default_limit: env_parse("FEED_DEFAULT_LIMIT").unwrap_or_else(default_feed_limit),
            max_limit: env_parse("FEED_MAX_LIMIT").unwrap_or_else(default_feed_max_limit),
        };
        if feed.max_limit == 0 {
            bail!("FEED_MAX_LIMIT must be greater than zero");
        }

        let cascade = CascadeConfig {
            purge_comments: env_flag("CASCADE_PURGE_COMMENTS"),
        };

        Ok(Config {
            app,
            store,
            feed,
            cascade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "APP_ENV",
            "PORT",
            "STORE_BACKEND",
            "DATABASE_URL",
            "FEED_MAX_LIMIT",
            "CASCADE_PURGE_COMMENTS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.http_port, 8010);
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.max_connections, 20);
        assert_eq!(config.store.min_connections, 5);
        assert_eq!(config.feed.default_limit, 20);
        assert_eq!(config.feed.max_limit, 100);
        assert!(!config.cascade.purge_comments);
    }

    #[test]
    #[serial]
    fn test_postgres_requires_database_url() {
        clear_env();
        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_memory_backend_and_purge_flag() {
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("CASCADE_PURGE_COMMENTS", "true");

        let config = Config::from_env().unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.store.database_url.is_none());
        assert!(config.cascade.purge_comments);
        clear_env();
    }
}
