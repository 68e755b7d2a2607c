use std::mem;
use tracing::{error, info, warn};

use crate::db::ListingStore;
use crate::domain::NormalizedListing;
use crate::pipeline::cancel::CancelToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub failed: usize,
    pub persisted: usize,
    /// Records never sent because the run was cancelled.
    pub discarded: usize,
}

impl BatchReport {
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

/// Buffers listings and hands them to the store in fixed-size batches.
/// A failed batch is logged and dropped; later batches still go out.
pub struct BatchWriter<'a, S: ?Sized> {
    store: &'a S,
    batch_size: usize,
    cancel: &'a CancelToken,
    pending: Vec<NormalizedListing>,
    report: BatchReport,
}

impl<'a, S: ListingStore + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, batch_size: usize, cancel: &'a CancelToken) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            cancel,
            pending: Vec::new(),
            report: BatchReport::default(),
        }
    }

    pub fn push(&mut self, listing: NormalizedListing) {
        self.pending.push(listing);
        if self.pending.len() >= self.batch_size {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        if self.cancel.is_cancelled() {
            let dropped = self.pending.len();
            self.pending.clear();
            self.report.discarded += dropped;
            warn!(dropped, "run cancelled, not flushing batch");
            return;
        }

        let batch = mem::take(&mut self.pending);
        self.report.attempted += 1;
        let number = self.report.attempted;

        match self.store.upsert_batch(&batch) {
            Ok(written) => {
                self.report.persisted += written.len();
                info!(batch = number, size = batch.len(), written = written.len(), "✅ batch persisted");
            }
            Err(e) => {
                self.report.failed += 1;
                error!(batch = number, size = batch.len(), error = %e, "❌ batch failed, dropping its records");
            }
        }
    }

    pub fn finish(mut self) -> BatchReport {
        self.flush();
        self.report
    }
}
