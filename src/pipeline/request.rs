use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::config::ScrapeSettings;
use crate::db::ListingStore;
use crate::domain::location::{is_valid_location, VALID_LOCATIONS};
use crate::domain::ListingCategory;
use crate::extract::StrategyPreference;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::orchestrator::{CategoryRequest, Orchestrator, RunBudget};
use crate::pipeline::summary::RunSummary;
use crate::transport::{HttpClient, Pacer, Transport};

pub const MAX_PROPERTIES_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSelection {
    Rent,
    Sale,
    Both,
}

impl ListingSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSelection::Rent => "rent",
            ListingSelection::Sale => "sale",
            ListingSelection::Both => "both",
        }
    }
}

fn default_location() -> String {
    "dublin".to_string()
}

fn default_use_json_api() -> bool {
    true
}

/// Body of `POST /scrape` and `POST /scrape/async`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeRequest {
    pub listing_type: ListingSelection,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub max_properties: Option<i64>,
    #[serde(default)]
    pub max_pages: Option<i64>,
    #[serde(default = "default_use_json_api")]
    pub use_json_api: bool,
}

/// A validated request, broken down per category.
#[derive(Debug, Clone)]
pub struct ScrapePlan {
    pub listing_type: ListingSelection,
    pub location: String,
    pub categories: Vec<CategoryRequest>,
}

impl ScrapeRequest {
    pub fn plan(&self) -> Result<ScrapePlan, String> {
        let location = self.location.trim().to_lowercase();
        if !is_valid_location(&location) {
            return Err(format!(
                "Invalid location. Must be one of: {}",
                VALID_LOCATIONS.join(", ")
            ));
        }

        let budget = match (self.max_properties, self.max_pages) {
            (Some(_), Some(_)) => {
                return Err("max_properties and max_pages cannot be combined".to_string())
            }
            (Some(n), None) if !(1..=MAX_PROPERTIES_LIMIT).contains(&n) => {
                return Err(format!("max_properties must be between 1 and {MAX_PROPERTIES_LIMIT}"))
            }
            (Some(n), None) => RunBudget::MaxRecords(n as usize),
            (None, Some(n)) if n < 1 || n > i64::from(u32::MAX) => {
                return Err("max_pages must be a positive page count".to_string())
            }
            (None, Some(n)) => RunBudget::MaxPages(n as u32),
            (None, None) => RunBudget::Unlimited,
        };

        let preference = StrategyPreference::from_use_json_api(self.use_json_api);
        let for_category = |category: ListingCategory, budget: RunBudget| CategoryRequest {
            category,
            location: location.clone(),
            budget,
            preference,
        };

        let categories = match self.listing_type {
            ListingSelection::Rent => vec![for_category(ListingCategory::Rent, budget)],
            ListingSelection::Sale => vec![for_category(ListingCategory::Sale, budget)],
            ListingSelection::Both => match budget {
                RunBudget::MaxRecords(n) => {
                    let rent = n.div_ceil(2);
                    let sale = n / 2;
                    [(ListingCategory::Rent, rent), (ListingCategory::Sale, sale)]
                        .into_iter()
                        .filter(|(_, share)| *share > 0)
                        .map(|(c, share)| for_category(c, RunBudget::MaxRecords(share)))
                        .collect()
                }
                other => vec![
                    for_category(ListingCategory::Rent, other),
                    for_category(ListingCategory::Sale, other),
                ],
            },
        };

        Ok(ScrapePlan {
            listing_type: self.listing_type,
            location,
            categories,
        })
    }
}

/// Run every category of a plan back to back over one transport session.
pub fn run_plan<C, P, S>(
    transport: &Transport<C, P>,
    store: &S,
    settings: &ScrapeSettings,
    cancel: &CancelToken,
    plan: &ScrapePlan,
) -> RunSummary
where
    C: HttpClient,
    P: Pacer,
    S: ListingStore + ?Sized,
{
    let started = Instant::now();
    let orchestrator = Orchestrator::new(transport, store, settings, cancel);

    let mut details = BTreeMap::new();
    for request in &plan.categories {
        if cancel.is_cancelled() {
            info!(category = %request.category, "run cancelled, skipping category");
            break;
        }
        let summary = orchestrator.run_category(request);
        details.insert(request.category, summary);
    }

    let count: usize = details.values().map(|c| c.count).sum();
    let success = details.values().any(|c| c.success);
    let error_kind = if success {
        None
    } else {
        details.values().find_map(|c| c.error_kind)
    };

    let message = if cancel.is_cancelled() && !success {
        "Scraping cancelled by user".to_string()
    } else if details.len() == 1 {
        details
            .values()
            .next()
            .map(|c| c.message.clone())
            .unwrap_or_default()
    } else if details.is_empty() {
        "No properties selected".to_string()
    } else {
        format!("Scraped {count} total properties")
    };

    let execution_time = started.elapsed().as_secs_f64();
    info!(listing_type = plan.listing_type.as_str(), success, count, execution_time, "run finished");

    RunSummary {
        success,
        message,
        count,
        details: Some(details),
        execution_time: Some(execution_time),
        error_kind,
    }
}
