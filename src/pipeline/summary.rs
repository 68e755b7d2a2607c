use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::ListingCategory;
use crate::errors::ErrorKind;
use crate::extract::ExtractionStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "page", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    FetchingCount,
    Paging(u32),
    Done,
    Aborted,
}

/// Outcome of one category run.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub listing_type: ListingCategory,
    pub success: bool,
    pub message: String,
    /// Newly persisted records.
    pub count: usize,
    pub pages_walked: u32,
    pub batches_attempted: usize,
    pub failed_batches: usize,
    pub final_state: RunState,
    /// Last state entered before `final_state`.
    pub reached_state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ExtractionStrategy>,
    pub stale_build_id: bool,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl CategorySummary {
    pub fn aborted(
        listing_type: ListingCategory,
        reached_state: RunState,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            listing_type,
            success: false,
            message: message.into(),
            count: 0,
            pages_walked: 0,
            batches_attempted: 0,
            failed_batches: 0,
            final_state: RunState::Aborted,
            reached_state,
            strategy: None,
            stale_build_id: false,
            cancelled: false,
            error_kind: Some(kind),
        }
    }
}

/// What a caller gets back from a run. Failures are values here, never panics.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub message: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<ListingCategory, CategorySummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl RunSummary {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            count: 0,
            details: None,
            execution_time: None,
            error_kind: Some(kind),
        }
    }

    pub fn pages_walked(&self) -> u32 {
        self.details
            .as_ref()
            .map(|d| d.values().map(|c| c.pages_walked).sum())
            .unwrap_or(0)
    }
}
