use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::NormalizedListing;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to read schema file: {0}")]
    Schema(#[from] std::io::Error),

    #[error("connection unavailable")]
    Unavailable,

    #[error("{0}")]
    Rejected(String),
}

/// What the store hands back for each row it wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedRecord {
    /// Storage key of the row.
    pub row_id: i64,
    /// Upstream listing id; `None` for insert-only rows.
    pub id: Option<i64>,
    pub url: String,
}

/// The listing store the pipeline writes into, keyed by listing id.
pub trait ListingStore {
    /// Every id currently stored.
    fn list_known_ids(&self) -> Result<HashSet<i64>, StoreError>;

    /// Insert or update by id, last write wins. Listings without an id are
    /// inserted as new rows and never join the known-id set.
    fn upsert_batch(&self, batch: &[NormalizedListing]) -> Result<Vec<PersistedRecord>, StoreError>;
}
