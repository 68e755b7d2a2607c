use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::transport::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://www.daft.ie";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Upper bound for `BATCH_SIZE`; one upsert transaction never holds more.
pub const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration. Every key has a default except the database path.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub max_pages: u32,
    pub max_fetch_retries: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub page_delay_ms: u64,
    pub detail_delay_ms: u64,
    pub batch_size: usize,
    pub fetch_details: bool,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub database_path: String,
}

/// The slice of configuration a pipeline run needs. No persistence details.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub max_pages: u32,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub page_delay: Duration,
    pub detail_delay: Duration,
    pub batch_size: usize,
    pub fetch_details: bool,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pages: 5,
            retry: RetryPolicy {
                max_retries: 2,
                delay: Duration::from_millis(2000),
            },
            request_timeout: Duration::from_millis(10_000),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_delay: Duration::from_millis(1500),
            detail_delay: Duration::from_millis(500),
            batch_size: 100,
            fetch_details: true,
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = get("LISTINGS_DB_PATH").ok_or(ConfigError::Missing("LISTINGS_DB_PATH"))?;

        Ok(Self {
            base_url: get("DAFT_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_pages: parse_or(&get, "MAX_PAGES_TO_FETCH", 5)?,
            max_fetch_retries: parse_or(&get, "MAX_FETCH_RETRIES", 2)?,
            retry_delay_ms: parse_or(&get, "RETRY_DELAY_MS", 2000)?,
            request_timeout_ms: parse_or(&get, "REQUEST_TIMEOUT", 10_000)?,
            user_agent: get("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            page_delay_ms: parse_or(&get, "PAGE_DELAY_MS", 1500)?,
            detail_delay_ms: parse_or(&get, "DETAIL_DELAY_MS", 500)?,
            batch_size: parse_or(&get, "BATCH_SIZE", 100usize)?.clamp(1, MAX_BATCH_SIZE),
            fetch_details: parse_or(&get, "FETCH_DETAILS", true)?,
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            database_path,
        })
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            base_url: self.base_url.clone(),
            max_pages: self.max_pages,
            retry: RetryPolicy {
                max_retries: self.max_fetch_retries,
                delay: Duration::from_millis(self.retry_delay_ms),
            },
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            user_agent: self.user_agent.clone(),
            page_delay: Duration::from_millis(self.page_delay_ms),
            detail_delay: Duration::from_millis(self.detail_delay_ms),
            batch_size: self.batch_size,
            fetch_details: self.fetch_details,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
