// errors.rs
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::StoreError;

/// Machine-readable failure class carried in every failed run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NetworkError,
    NotFound,
    RateLimitError,
    ScrapingError,
    ConfigError,
    DatabaseError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimitError => "RATE_LIMIT_ERROR",
            ErrorKind::ScrapingError => "SCRAPING_ERROR",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::DatabaseError => "DATABASE_ERROR",
        }
    }
}

/// Everything that can go wrong while acquiring listings from upstream.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("network error fetching {url} after {attempts} attempt(s): {reason}")]
    Network {
        url: String,
        attempts: u32,
        timed_out: bool,
        reason: String,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("blocked by upstream at {url}, retry after {}ms", retry_after.as_millis())]
    RateLimited { url: String, retry_after: Duration },

    #[error("scraping error at {url}: {reason}")]
    Scraping { url: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ScrapeError {
    pub fn scraping(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ScrapeError::Scraping {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Network { .. } => ErrorKind::NetworkError,
            ScrapeError::NotFound { .. } => ErrorKind::NotFound,
            ScrapeError::RateLimited { .. } => ErrorKind::RateLimitError,
            ScrapeError::Scraping { .. } => ErrorKind::ScrapingError,
            ScrapeError::Configuration(_) => ErrorKind::ConfigError,
            ScrapeError::Storage(_) => ErrorKind::DatabaseError,
        }
    }
}

/// Errors surfaced by the HTTP layer (routing, bad input, downstream DB).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Database Error: {0}")]
    DbError(String),

    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::DbError(_) => 500,
            ServerError::InternalError => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::NotFound => "NOT_FOUND",
            ServerError::BadRequest(_) => "VALIDATION_ERROR",
            ServerError::DbError(_) => ErrorKind::DatabaseError.as_str(),
            ServerError::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        ServerError::DbError(err.to_string())
    }
}
