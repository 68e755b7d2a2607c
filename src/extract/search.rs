use scraper::Html;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{ListingCategory, RawCandidate};
use crate::extract::models::SearchPageProps;
use crate::extract::{markup, structured};

/// Results per page when upstream doesn't say.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Which code path produced a page's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    Structured,
    MarkupFallback,
}

/// What the caller allows. `StructuredFirst` still falls back to markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyPreference {
    #[default]
    StructuredFirst,
    MarkupOnly,
}

impl StrategyPreference {
    pub fn from_use_json_api(use_json_api: bool) -> Self {
        if use_json_api {
            StrategyPreference::StructuredFirst
        } else {
            StrategyPreference::MarkupOnly
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractContext<'a> {
    pub base_url: &'a str,
    pub category: ListingCategory,
    pub max_pages: u32,
}

#[derive(Debug, Clone)]
pub struct SearchPage {
    pub strategy: ExtractionStrategy,
    pub candidates: Vec<RawCandidate>,
    /// Pages available upstream, already capped. `None` when the page doesn't say.
    pub total_pages: Option<u32>,
}

enum SearchSource {
    Structured(SearchPageProps),
    Markup,
}

/// The one place that decides between the structured payload and markup.
fn detect(document: &Html, preference: StrategyPreference) -> SearchSource {
    if preference == StrategyPreference::MarkupOnly {
        return SearchSource::Markup;
    }

    match structured::search_props(document) {
        Ok(props) => SearchSource::Structured(props),
        Err(reason) => {
            info!(%reason, "falling back to markup parsing");
            SearchSource::Markup
        }
    }
}

pub fn extract_search_results(html: &str, ctx: &ExtractContext, preference: StrategyPreference) -> SearchPage {
    let document = Html::parse_document(html);

    match detect(&document, preference) {
        SearchSource::Structured(props) => SearchPage {
            strategy: ExtractionStrategy::Structured,
            candidates: structured::search_candidates(&props, ctx),
            total_pages: structured::total_pages(&props, ctx),
        },
        SearchSource::Markup => SearchPage {
            strategy: ExtractionStrategy::MarkupFallback,
            candidates: markup::search_candidates(&document, ctx),
            total_pages: markup::total_pages(&document, ctx),
        },
    }
}

/// Clamp an upstream page count to what we're willing to walk.
pub fn cap_pages(computed: u64, max_pages: u32) -> u32 {
    if computed > u64::from(max_pages) {
        warn!(computed, max_pages, "upstream page count exceeds max pages, capping");
        return max_pages;
    }
    computed as u32
}

/// A detail record: the listing API payload, or the listing's own page.
pub enum DetailSource<'a> {
    Payload(&'a Value),
    Markup(&'a str),
}

/// Turn a detail source into a candidate. Whatever `existing` already knows
/// and the detail source doesn't is carried over; populated fields are never
/// overwritten by the markup path.
pub fn extract_detail(
    source: DetailSource,
    existing: Option<&RawCandidate>,
    ctx: &ExtractContext,
) -> Option<RawCandidate> {
    match source {
        DetailSource::Payload(payload) => {
            let mut candidate = structured::detail_candidate(payload, ctx)?;
            if let Some(existing) = existing {
                candidate.fill_missing_from(existing);
            }
            Some(candidate)
        }
        DetailSource::Markup(html) => {
            let document = Html::parse_document(html);
            let mut candidate = existing.cloned().unwrap_or_default();
            markup::merge_detail(&document, &mut candidate);

            if existing.is_none() && candidate == RawCandidate::default() {
                return None;
            }
            Some(candidate)
        }
    }
}
