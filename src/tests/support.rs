// Shared fakes and fixtures for the pipeline tests.

use crate::config::ScrapeSettings;
use crate::db::connection::{init_db, Database};
use crate::db::store::PersistedRecord;
use crate::db::{ListingStore, StoreError};
use crate::domain::NormalizedListing;
use crate::transport::client::{HttpFailure, HttpResponse, RequestKind};
use crate::transport::{HttpClient, Pacer, RetryPolicy};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

pub const BASE: &str = "https://daft.test";
pub const RENT_DUBLIN: &str = "https://daft.test/property-for-rent/dublin-city";
pub const SALE_DUBLIN: &str = "https://daft.test/property-for-sale/dublin";

pub fn page_url(search: &str, page: u32) -> String {
    if page <= 1 {
        search.to_string()
    } else {
        format!("{search}?page={page}")
    }
}

/// Settings with real-looking delays but no detail fetches.
pub fn test_settings() -> ScrapeSettings {
    ScrapeSettings {
        base_url: BASE.to_string(),
        max_pages: 5,
        retry: RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(2000),
        },
        page_delay: Duration::from_millis(1500),
        detail_delay: Duration::from_millis(500),
        batch_size: 100,
        fetch_details: false,
        ..ScrapeSettings::default()
    }
}

type Scripted = Result<HttpResponse, HttpFailure>;

/// In-memory upstream. Each URL has a queue of responses; the last one
/// repeats. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedClient {
    routes: RefCell<HashMap<String, VecDeque<Scripted>>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.push(
            url,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        )
    }

    pub fn fail(self, url: &str, failure: HttpFailure) -> Self {
        self.push(url, Err(failure))
    }

    fn push(self, url: &str, scripted: Scripted) -> Self {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    /// Handle to the call log that outlives the client.
    pub fn calls(&self) -> CallLog {
        CallLog(Rc::clone(&self.calls))
    }
}

impl HttpClient for ScriptedClient {
    fn get(&self, url: &str, _kind: RequestKind) -> Result<HttpResponse, HttpFailure> {
        self.calls.borrow_mut().push(url.to_string());

        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> Scripted {
    Ok(HttpResponse {
        status: 404,
        body: String::new(),
    })
}

#[derive(Clone)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn all(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.0.borrow().iter().filter(|u| *u == url).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|u| u.starts_with(prefix)).count()
    }
}

/// Records every pause instead of sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Rc<RefCell<Vec<Duration>>> {
        Rc::clone(&self.pauses)
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

/// Thread-safe pacer for the router tests, where the app may run elsewhere.
pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&self, _duration: Duration) {}
}

/// Listing store kept in memory, with batches that can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    pub rows: RefCell<BTreeMap<i64, NormalizedListing>>,
    pub batches: RefCell<Vec<Vec<Option<i64>>>>,
    failing_batches: HashSet<usize>,
    fail_known_ids: bool,
    calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known(ids: &[i64]) -> Self {
        let store = Self::default();
        for &id in ids {
            store.rows.borrow_mut().insert(id, placeholder(id));
        }
        store
    }

    /// 1-based numbers of the upsert calls that should fail.
    pub fn failing(mut self, batches: &[usize]) -> Self {
        self.failing_batches = batches.iter().copied().collect();
        self
    }

    pub fn unreachable() -> Self {
        Self {
            fail_known_ids: true,
            ..Self::default()
        }
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.borrow().keys().copied().collect()
    }

    pub fn sent_ids(&self) -> Vec<i64> {
        self.batches.borrow().iter().flatten().flatten().copied().collect()
    }
}

impl ListingStore for MemoryStore {
    fn list_known_ids(&self) -> Result<HashSet<i64>, StoreError> {
        if self.fail_known_ids {
            return Err(StoreError::Unavailable);
        }
        Ok(self.rows.borrow().keys().copied().collect())
    }

    fn upsert_batch(&self, batch: &[NormalizedListing]) -> Result<Vec<PersistedRecord>, StoreError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        self.batches.borrow_mut().push(batch.iter().map(|l| l.id).collect());

        if self.failing_batches.contains(&n) {
            return Err(StoreError::Rejected(format!("batch {n} rejected")));
        }

        let mut rows = self.rows.borrow_mut();
        Ok(batch
            .iter()
            .filter_map(|l| {
                let id = l.id?;
                rows.insert(id, l.clone());
                Some(PersistedRecord {
                    row_id: id,
                    id: Some(id),
                    url: l.url.clone(),
                })
            })
            .collect())
    }
}

fn placeholder(id: i64) -> NormalizedListing {
    NormalizedListing {
        id: Some(id),
        url: format!("{BASE}/for-rent/known/{id}"),
        title: "known".to_string(),
        listing_type: crate::domain::ListingCategory::Rent,
        price_eur: None,
        price_period: None,
        bedrooms: None,
        bathrooms: None,
        property_type: None,
        ber_rating: None,
        latitude: None,
        longitude: None,
        date_listed: None,
        image_url: None,
        address_full: String::new(),
    }
}

/// Fresh SQLite file with the production schema. Keep the `TempDir` alive.
pub fn temp_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
    let path = dir.path().join("listings.sqlite3");
    let db = Database::new(path.to_string_lossy().to_string());

    init_db(&db, "sql/schema.sql").unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    (dir, db)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn listing_json(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("{id} Main Street, Dublin 2"),
        "price": "€2,000 per month",
        "numBedrooms": "2 Bed",
        "numBathrooms": "1 Bath",
        "propertyType": "Apartment",
        "seoFriendlyPath": format!("/for-rent/apartment-{id}-main-street-dublin-2/{id}"),
        "point": { "coordinates": [-6.2603, 53.3498] },
        "media": { "images": [ { "size400x300": format!("https://img.test/{id}-400.jpg"), "size720x480": format!("https://img.test/{id}-720.jpg") } ] },
        "ber": { "rating": "B2" }
    })
}

pub fn next_data_html(next_data: &Value) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Daft</title></head><body><div id="__next"></div><script id="__NEXT_DATA__" type="application/json">{next_data}</script></body></html>"#
    )
}

/// A structured search page carrying `ids` and the given total.
pub fn search_page(ids: &[i64], total_results: u64) -> String {
    let listings: Vec<Value> = ids.iter().map(|&id| json!({ "listing": listing_json(id) })).collect();
    next_data_html(&json!({
        "buildId": "build-123",
        "props": { "pageProps": {
            "listings": listings,
            "paging": { "totalResults": total_results, "pageSize": 20 }
        }}
    }))
}

pub fn root_page(build_id: &str) -> String {
    next_data_html(&json!({ "buildId": build_id, "props": { "pageProps": {} } }))
}

pub fn detail_payload(id: i64) -> Value {
    let mut listing = listing_json(id);
    listing["ber"] = json!({ "rating": "A3" });
    listing["publishDate"] = json!("2024-03-01T10:00:00Z");
    json!({ "pageProps": { "listing": listing } })
}

pub fn card_html(id: i64, price: &str) -> String {
    format!(
        r#"<div data-testid="card-container">
  <a href="/for-rent/apartment-{id}-some-road-dublin-4/{id}">
    <div data-tracking="srp_tagline"><p>Bright apartment</p></div>
    <div data-tracking="srp_address"><p>{id} Some Road, Dublin 4</p></div>
    <div data-tracking="srp_price"><p>{price}</p></div>
    <div data-tracking="srp_meta"><span>3 Bed</span><span>2 Bath</span><span>Apartment</span></div>
    <div data-tracking="srp_ber" aria-label="BER C1">BER C1</div>
    <img src="https://img.test/{id}.jpg">
  </a>
  <a data-testid="satelite-button" href="https://www.google.com/maps/search/?api=1&amp;query=x&amp;q=loc:53.33+-6.25">Map</a>
</div>"#
    )
}

/// A markup-only search page (no structured payload).
pub fn markup_page(cards: &[String], total_results: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><body><h1>1 - 20 of {total_results} total results</h1><main>{}</main></body></html>"#,
        cards.join("\n")
    )
}

pub fn detail_html() -> String {
    r#"<!DOCTYPE html><html><body>
  <p data-testid="ber" aria-label="BER A2">BER A2</p>
  <a data-testid="satelite-button" href="https://www.google.com/maps/@?api=1&amp;map_action=map&amp;viewpoint=53.3,-6.2">Satellite</a>
  <p data-testid="date-listed">Listed: 05/02/2024</p>
</body></html>"#
        .to_string()
}
