use std::cell::{Cell, RefCell};
use tracing::{debug, error, info, warn};

use crate::config::ScrapeSettings;
use crate::db::ListingStore;
use crate::domain::location::property_ref_from_url;
use crate::domain::{ListingCategory, NormalizedListing, RawCandidate, SearchTarget};
use crate::errors::{ErrorKind, ScrapeError};
use crate::extract::{
    extract_detail, extract_search_results, DetailSource, ExtractContext, ExtractionStrategy,
    StrategyPreference,
};
use crate::pipeline::batch::BatchWriter;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::dedup::{Admission, DedupFilter};
use crate::pipeline::summary::{CategorySummary, RunState};
use crate::transport::{BuildId, HttpClient, Pacer, Transport};

/// How far a category run may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunBudget {
    /// Every available page, up to the configured maximum.
    #[default]
    Unlimited,
    /// Stop once this many new records have been produced.
    MaxRecords(usize),
    /// Stop once this many pages have been walked.
    MaxPages(u32),
}

#[derive(Debug, Clone)]
pub struct CategoryRequest {
    pub category: ListingCategory,
    pub location: String,
    pub budget: RunBudget,
    pub preference: StrategyPreference,
}

fn budget_spent(budget: RunBudget, produced: usize) -> bool {
    matches!(budget, RunBudget::MaxRecords(max) if produced >= max)
}

/// Drives one pipeline run: paging, detail enrichment, dedup, batching.
/// Everything it touches is borrowed, so one transport session serves a
/// whole run across categories.
pub struct Orchestrator<'a, C, P, S: ?Sized> {
    transport: &'a Transport<C, P>,
    store: &'a S,
    settings: &'a ScrapeSettings,
    cancel: &'a CancelToken,
    warmed_up: Cell<bool>,
    build_id: RefCell<Option<BuildId>>,
}

impl<'a, C, P, S> Orchestrator<'a, C, P, S>
where
    C: HttpClient,
    P: Pacer,
    S: ListingStore + ?Sized,
{
    pub fn new(
        transport: &'a Transport<C, P>,
        store: &'a S,
        settings: &'a ScrapeSettings,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            transport,
            store,
            settings,
            cancel,
            warmed_up: Cell::new(false),
            build_id: RefCell::new(None),
        }
    }

    pub fn run_category(&self, request: &CategoryRequest) -> CategorySummary {
        let category = request.category;
        let mut state = RunState::Idle;
        info!(%category, location = %request.location, budget = ?request.budget, ?state, "🚀 starting category run");

        if !self.warmed_up.replace(true) {
            self.transport.warm_up();
        }

        let known = match self.store.list_known_ids() {
            Ok(ids) => ids,
            Err(e) => return self.abort_on(category, state, &ScrapeError::from(e), "Failed to load known ids"),
        };
        let mut dedup = DedupFilter::new(known);
        info!(known = dedup.known_len(), "loaded known-id snapshot");

        state = RunState::FetchingCount;
        debug!(%category, ?state, "resolving page count");

        let ctx = ExtractContext {
            base_url: self.transport.base_url(),
            category,
            max_pages: self.settings.max_pages,
        };
        let target = SearchTarget::new(self.transport.base_url(), category, &request.location);

        let first_html = match self.transport.fetch_html(&target.page_url(1)) {
            Ok(html) => html,
            Err(e) => return self.abort_on(category, state, &e, "Failed to fetch property count"),
        };
        let first = extract_search_results(&first_html, &ctx, request.preference);

        let available = match first.total_pages {
            Some(pages) => pages.max(1),
            None if !first.candidates.is_empty() => {
                warn!(%category, "no page count on first page, walking it alone");
                1
            }
            None => {
                error!(%category, url = %target.url, "no count data and no listings on first page");
                return CategorySummary::aborted(category, state, ErrorKind::ScrapingError, "Failed to fetch property count");
            }
        };

        let to_walk = match request.budget {
            RunBudget::MaxPages(n) => available.min(n).min(self.settings.max_pages),
            _ => available.min(self.settings.max_pages),
        }
        .max(1);
        info!(%category, available, to_walk, strategy = ?first.strategy, "page count resolved");

        let mut writer = BatchWriter::new(self.store, self.settings.batch_size, self.cancel);
        let mut produced = 0usize;
        let mut pages_walked = 0u32;
        let mut strategy: ExtractionStrategy = first.strategy;
        let mut cancelled = false;
        let mut first_page = Some(first);

        'pages: for n in 1..=to_walk {
            if self.cancel.is_cancelled() {
                warn!(%category, page = n, "cancellation requested, stopping before page");
                cancelled = true;
                break;
            }
            if budget_spent(request.budget, produced) {
                info!(%category, produced, "record budget reached");
                break;
            }
            state = RunState::Paging(n);

            let page = match first_page.take() {
                Some(page) => page,
                None => {
                    self.transport.pace(self.settings.page_delay);
                    let url = target.page_url(n);
                    match self.transport.fetch_html(&url) {
                        Ok(html) => extract_search_results(&html, &ctx, request.preference),
                        Err(e) => {
                            warn!(%category, page = n, error = %e, "page fetch failed, skipping");
                            continue;
                        }
                    }
                }
            };
            pages_walked += 1;

            strategy = page.strategy;

            if page.candidates.is_empty() {
                warn!(%category, page = n, "page yielded no listings, moving on");
                continue;
            }
            info!(%category, page = n, found = page.candidates.len(), strategy = ?page.strategy, "📄 page parsed");

            for candidate in page.candidates {
                if budget_spent(request.budget, produced) {
                    info!(%category, produced, "record budget reached");
                    break 'pages;
                }

                // Skip the detail fetch for anything dedup would reject anyway.
                if !matches!(dedup.check(candidate.listing_id()), Admission::Admit(_)) {
                    debug!(id = ?candidate.id, "already known or seen, skipping");
                    continue;
                }

                let candidate = if self.settings.fetch_details {
                    self.enrich(candidate, &ctx, request.preference)
                } else {
                    candidate
                };

                let listing = NormalizedListing::from_candidate(candidate, category);
                if let Admission::Admit(id) = dedup.admit(listing.id) {
                    debug!(id, url = %listing.url, "admitted");
                    writer.push(listing);
                    produced += 1;
                }
            }
        }

        if self.cancel.is_cancelled() {
            cancelled = true;
        }

        let report = writer.finish();
        let stale_build_id = self
            .build_id
            .borrow()
            .as_ref()
            .map(BuildId::is_stale)
            .unwrap_or(false);

        let mut summary = CategorySummary {
            listing_type: category,
            success: true,
            message: String::new(),
            count: report.persisted,
            pages_walked,
            batches_attempted: report.attempted,
            failed_batches: report.failed,
            final_state: RunState::Done,
            reached_state: state,
            strategy: Some(strategy),
            stale_build_id,
            cancelled,
            error_kind: None,
        };

        if report.all_failed() {
            summary.success = false;
            summary.final_state = RunState::Aborted;
            summary.error_kind = Some(ErrorKind::DatabaseError);
            summary.message = format!("All {} batch(es) failed to persist", report.attempted);
        } else if cancelled {
            summary.success = false;
            summary.final_state = RunState::Aborted;
            summary.message = format!("Scraping cancelled after {pages_walked} page(s)");
        } else if produced == 0 {
            summary.message = format!("No new {category} properties to insert");
        } else {
            summary.message = format!("Successfully scraped and uploaded {} new {category} properties", report.persisted);
        }

        info!(
            %category,
            reached_state = ?summary.reached_state,
            final_state = ?summary.final_state,
            produced,
            persisted = report.persisted,
            failed_batches = report.failed,
            processed = dedup.processed_len(),
            "🏁 category run finished"
        );
        summary
    }

    /// Detail enrichment for one candidate: the listing API first when
    /// allowed, then the listing's own page. Never fails; worst case the
    /// search-page candidate comes back unchanged.
    fn enrich(&self, candidate: RawCandidate, ctx: &ExtractContext, preference: StrategyPreference) -> RawCandidate {
        self.transport.pace(self.settings.detail_delay);

        if preference == StrategyPreference::StructuredFirst {
            if let Some((id, slug)) = property_ref_from_url(ctx.base_url, &candidate.url) {
                let build_id = self.build_id();
                let api_url = self.transport.property_api_url(&build_id, &id, &slug);

                match self.transport.fetch_json(&api_url) {
                    Ok(payload) => {
                        if let Some(detailed) = extract_detail(DetailSource::Payload(&payload), Some(&candidate), ctx) {
                            return detailed;
                        }
                    }
                    Err(e) => debug!(url = %api_url, error = %e, "detail API unavailable, trying page"),
                }
            }
        }

        match self.transport.fetch_html(&candidate.url) {
            Ok(html) => extract_detail(DetailSource::Markup(&html), Some(&candidate), ctx).unwrap_or(candidate),
            Err(e) => {
                warn!(url = %candidate.url, error = %e, "detail fetch failed, keeping search data");
                candidate
            }
        }
    }

    /// Resolved once per run, on first need.
    fn build_id(&self) -> BuildId {
        if let Some(id) = self.build_id.borrow().as_ref() {
            return id.clone();
        }
        let id = self.transport.resolve_build_id();
        *self.build_id.borrow_mut() = Some(id.clone());
        id
    }

    fn abort_on(&self, category: ListingCategory, state: RunState, err: &ScrapeError, message: &str) -> CategorySummary {
        error!(%category, ?state, error = %err, "{message}");
        CategorySummary::aborted(category, state, err.kind(), format!("{message}: {err}"))
    }
}
