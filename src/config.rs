use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::error::{AppError, Result};

pub const BASE_URL: &str = "https://scores24.live/ru";

/// Source label stored on predictions ingested from the trends page.
pub const PREDICTION_SOURCE: &str = "scores24.live";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upper bound on pooled connections. The batch only ever uses one at a time.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Connection defaults, used when the matching POSTGRES_* variable is unset.
pub mod db_defaults {
    pub const HOST: &str = "localhost";
    pub const PORT: u16 = 5432;
    pub const DATABASE: &str = "football_db";
    pub const USER: &str = "football_user";
    pub const PASSWORD: &str = "mysecretpassword";
}

/// Which extraction strategy turns a results page into match records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// CSS selectors over the rendered match list.
    Html,
    /// The URQL cache embedded in a script tag.
    Json,
}

impl ExtractorKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(ExtractorKind::Html),
            "json" => Ok(ExtractorKind::Json),
            other => Err(AppError::Config(format!(
                "EXTRACTOR must be 'html' or 'json', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractorKind::Html => write!(f, "html"),
            ExtractorKind::Json => write!(f, "json"),
        }
    }
}

/// Postgres connection options handed to the store constructor.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl DbConfig {
    /// Options set field by field, so credentials need no URL escaping.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: db_defaults::HOST.to_string(),
            port: db_defaults::PORT,
            database: db_defaults::DATABASE.to_string(),
            user: db_defaults::USER.to_string(),
            password: db_defaults::PASSWORD.to_string(),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Bounded retry around store writes: fixed attempt count, fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub log_level: String,
    /// Site root, without trailing slash (SCORES_BASE_URL)
    pub base_url: String,
    /// Results extraction strategy (EXTRACTOR=html|json)
    pub extractor: ExtractorKind,
    /// Number of days back from today to fetch results for, today included (LOOKBACK_DAYS)
    pub lookback_days: u32,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    /// Strip non-word characters from team names before matching (STRICT_NAMES)
    pub strict_names: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let db = DbConfig {
            host: var("POSTGRES_HOST", db_defaults::HOST),
            port: var("POSTGRES_PORT", &db_defaults::PORT.to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("POSTGRES_PORT must be a valid port number".to_string()))?,
            database: var("POSTGRES_DB", db_defaults::DATABASE),
            user: var("POSTGRES_USER", db_defaults::USER),
            password: var("POSTGRES_PASSWORD", db_defaults::PASSWORD),
        };

        let retry_default = RetryPolicy::default();

        Ok(Self {
            db,
            log_level: var("LOG_LEVEL", "info"),
            base_url: var("SCORES_BASE_URL", BASE_URL).trim_end_matches('/').to_string(),
            extractor: ExtractorKind::parse(&var("EXTRACTOR", "html"))?,
            lookback_days: var("LOOKBACK_DAYS", "3").parse::<u32>().unwrap_or(3).max(1),
            http_timeout: Duration::from_secs(
                var("HTTP_TIMEOUT_SECS", "20").parse::<u64>().unwrap_or(20),
            ),
            retry: RetryPolicy {
                attempts: var("STORE_RETRY_ATTEMPTS", "3")
                    .parse::<u32>()
                    .unwrap_or(retry_default.attempts)
                    .max(1),
                delay: Duration::from_millis(
                    var("STORE_RETRY_DELAY_MS", "2000")
                        .parse::<u64>()
                        .unwrap_or(retry_default.delay.as_millis() as u64),
                ),
            },
            strict_names: parse_bool(&var("STRICT_NAMES", "true")).unwrap_or(true),
        })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.db, DbConfig::default());
        assert_eq!(cfg.db.port, 5432);
        assert_eq!(cfg.extractor, ExtractorKind::Html);
        assert_eq!(cfg.lookback_days, 3);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert!(cfg.strict_names);
        assert_eq!(cfg.base_url, BASE_URL);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config_from(&[
            ("POSTGRES_HOST", "db.internal"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_DB", "scores"),
            ("EXTRACTOR", "JSON"),
            ("SCORES_BASE_URL", "http://localhost:8080/"),
            ("STRICT_NAMES", "false"),
            ("STORE_RETRY_ATTEMPTS", "0"),
        ])
        .unwrap();
        assert_eq!(cfg.db.host, "db.internal");
        assert_eq!(cfg.db.port, 6543);
        assert_eq!(cfg.db.database, "scores");
        assert_eq!(cfg.extractor, ExtractorKind::Json);
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert!(!cfg.strict_names);
        assert_eq!(cfg.retry.attempts, 1, "attempts are clamped to at least one");
    }

    #[test]
    fn invalid_port_and_extractor_are_rejected() {
        assert!(matches!(
            config_from(&[("POSTGRES_PORT", "not-a-port")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("EXTRACTOR", "xpath")]),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn debug_output_redacts_password() {
        let db = DbConfig::default();
        let rendered = format!("{db:?}");
        assert!(!rendered.contains(db_defaults::PASSWORD));
    }

    #[test]
    fn reserved_characters_in_credentials_survive() {
        let cfg = config_from(&[
            ("POSTGRES_USER", "ops@team"),
            ("POSTGRES_PASSWORD", "pa/ss#1?x"),
            ("POSTGRES_HOST", "db.internal"),
            ("POSTGRES_PORT", "6543"),
        ])
        .unwrap();
        assert_eq!(cfg.db.password, "pa/ss#1?x");

        let opts = cfg.db.connect_options();
        assert_eq!(opts.get_host(), "db.internal");
        assert_eq!(opts.get_port(), 6543);
        assert_eq!(opts.get_username(), "ops@team");
        assert_eq!(opts.get_database(), Some("football_db"));
    }
}
