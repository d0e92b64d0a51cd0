use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const QUEUE_DIRECTORY: &str = "QUEUE_DIRECTORY";
pub const ERROR_DIRECTORY: &str = "ERROR_DIRECTORY";
pub const LEMMATIZATION_ENDPOINT_URL: &str = "LEMMATIZATION_ENDPOINT_URL";
pub const WORD_COUNT_DATA_ENDPOINT: &str = "WORD_COUNT_DATA_ENDPOINT";
pub const TRIPLE_DATA_ENDPOINT: &str = "TRIPLE_DATA_ENDPOINT";
pub const ONTOLOGY_NAMESPACE: &str = "ONTOLOGY_NAMESPACE";
pub const CONNECT_TIMEOUT_SECS: &str = "KNOX_CONNECT_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_SECS: &str = "KNOX_REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_MS: &str = "KNOX_POLL_INTERVAL_MS";
pub const LEMMATIZER_RETRIES: &str = "KNOX_LEMMATIZER_RETRIES";
pub const MAX_ITEM_ATTEMPTS: &str = "KNOX_MAX_ITEM_ATTEMPTS";
pub const LISTEN_ADDR: &str = "KNOX_LISTEN_ADDR";

pub const DEFAULT_ONTOLOGY_NAMESPACE: &str = "http://www.thisistheknowledgelayer.com/ontology#";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    Missing(&'static str),
    #[error("Invalid URL in {key}: {reason}")]
    InvalidUrl { key: &'static str, reason: String },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-wide settings, built once at startup and handed to each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnoxConfig {
    /// Directory the ingestion service writes payloads into and the driver polls
    pub queue_dir: PathBuf,
    /// Directory for backups and rejected queue items
    pub error_dir: PathBuf,
    pub lemmatizer_url: String,
    pub word_count_url: String,
    pub triple_data_url: String,
    /// Base IRI of the knox ontology terms and individuals
    pub ontology_namespace: String,
    pub connect_timeout_seconds: u32,
    pub request_timeout_seconds: u32,
    pub poll_interval_ms: u64,
    /// Extra attempts for a lemmatizer call that failed to connect
    pub lemmatizer_retries: u32,
    /// Times a queue item may be kept for a later attempt before it is rejected
    pub max_item_attempts: u32,
    pub listen_addr: SocketAddr,
}

impl Default for KnoxConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("knox");

        Self {
            queue_dir: data_dir.join("queue"),
            error_dir: data_dir.join("errors"),
            lemmatizer_url: String::new(),
            word_count_url: String::new(),
            triple_data_url: String::new(),
            ontology_namespace: DEFAULT_ONTOLOGY_NAMESPACE.to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 60,
            poll_interval_ms: 1000,
            lemmatizer_retries: 2,
            max_item_attempts: 5,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl KnoxConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for optional keys.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let config = Self {
            queue_dir: lookup(QUEUE_DIRECTORY).map_or(defaults.queue_dir, PathBuf::from),
            error_dir: lookup(ERROR_DIRECTORY).map_or(defaults.error_dir, PathBuf::from),
            lemmatizer_url: required(LEMMATIZATION_ENDPOINT_URL)?,
            word_count_url: required(WORD_COUNT_DATA_ENDPOINT)?,
            triple_data_url: required(TRIPLE_DATA_ENDPOINT)?,
            ontology_namespace: lookup(ONTOLOGY_NAMESPACE)
                .unwrap_or(defaults.ontology_namespace),
            connect_timeout_seconds: parse_or(
                &lookup,
                CONNECT_TIMEOUT_SECS,
                defaults.connect_timeout_seconds,
            )?,
            request_timeout_seconds: parse_or(
                &lookup,
                REQUEST_TIMEOUT_SECS,
                defaults.request_timeout_seconds,
            )?,
            poll_interval_ms: parse_or(&lookup, POLL_INTERVAL_MS, defaults.poll_interval_ms)?,
            lemmatizer_retries: parse_or(
                &lookup,
                LEMMATIZER_RETRIES,
                defaults.lemmatizer_retries,
            )?,
            max_item_attempts: parse_or(&lookup, MAX_ITEM_ATTEMPTS, defaults.max_item_attempts)?,
            listen_addr: parse_or(&lookup, LISTEN_ADDR, defaults.listen_addr)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_url(LEMMATIZATION_ENDPOINT_URL, &self.lemmatizer_url)?;
        check_url(WORD_COUNT_DATA_ENDPOINT, &self.word_count_url)?;
        check_url(TRIPLE_DATA_ENDPOINT, &self.triple_data_url)?;

        if self.ontology_namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: ONTOLOGY_NAMESPACE,
                value: String::new(),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: REQUEST_TIMEOUT_SECS,
                value: "0".into(),
            });
        }
        if self.max_item_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: MAX_ITEM_ATTEMPTS,
                value: "0".into(),
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_seconds))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_seconds))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rejected_dir(&self) -> PathBuf {
        self.error_dir.join("rejected")
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn check_url(key: &'static str, value: &str) -> ConfigResult<()> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            key,
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
