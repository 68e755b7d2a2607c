use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::ScrapeSettings;
use crate::errors::ScrapeError;
use crate::transport::client::{HttpClient, HttpFailure, HttpResponse, RequestKind};
use crate::transport::next_data::extract_next_data;
use crate::transport::retry::{with_retries, Pacer, RetryCause, RetryPolicy, Step};

/// Last build identifier seen in the wild. Used when the live one can't be read.
pub const FALLBACK_BUILD_ID: &str = "eYQ3CuRxzsMJz17gSBSMk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildIdOrigin {
    Resolved,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildId {
    pub value: String,
    pub origin: BuildIdOrigin,
}

impl BuildId {
    pub fn is_stale(&self) -> bool {
        self.origin == BuildIdOrigin::Fallback
    }
}

/// The long-lived upstream session for one pipeline run.
pub struct Transport<C, P> {
    client: C,
    pacer: P,
    base_url: String,
    retry: RetryPolicy,
}

impl<C: HttpClient, P: Pacer> Transport<C, P> {
    pub fn new(client: C, pacer: P, settings: &ScrapeSettings) -> Self {
        Self {
            client,
            pacer,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            retry: settings.retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Courtesy delay between upstream requests.
    pub fn pace(&self, duration: std::time::Duration) {
        if !duration.is_zero() {
            self.pacer.pause(duration);
        }
    }

    pub fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        self.fetch(url, RequestKind::Page)
    }

    /// Fetch a JSON API endpoint. A body that isn't JSON is not retried.
    pub fn fetch_json(&self, url: &str) -> Result<Value, ScrapeError> {
        let body = self.fetch(url, RequestKind::Api)?;
        serde_json::from_str(&body)
            .map_err(|e| ScrapeError::scraping(url, format!("invalid JSON response: {e}")))
    }

    /// Fetch a page and pull out its embedded `__NEXT_DATA__` payload.
    pub fn fetch_embedded_json(&self, url: &str) -> Result<Value, ScrapeError> {
        let html = self.fetch_html(url)?;
        extract_next_data(&html).map_err(|e| ScrapeError::scraping(url, e.to_string()))
    }

    /// Visit the site root once so the session picks up cookies. Failures are ignored.
    pub fn warm_up(&self) {
        match self.client.get(&self.base_url, RequestKind::Page) {
            Ok(resp) => info!(status = resp.status, "session warm-up"),
            Err(e) => warn!(?e, "session warm-up failed"),
        }
    }

    /// Read the deployment build id from the root page. Never fails: falls back
    /// to [`FALLBACK_BUILD_ID`] and says so.
    pub fn resolve_build_id(&self) -> BuildId {
        let resolved = self
            .fetch_embedded_json(&self.base_url)
            .and_then(|data| {
                data.get("buildId")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| ScrapeError::scraping(&self.base_url, "buildId not present in __NEXT_DATA__"))
            });

        match resolved {
            Ok(value) => {
                info!(build_id = %value, "resolved build id");
                BuildId {
                    value,
                    origin: BuildIdOrigin::Resolved,
                }
            }
            Err(e) => {
                warn!(error = %e, fallback = FALLBACK_BUILD_ID, "using stale fallback build id");
                BuildId {
                    value: FALLBACK_BUILD_ID.to_string(),
                    origin: BuildIdOrigin::Fallback,
                }
            }
        }
    }

    pub fn property_api_url(&self, build_id: &BuildId, property_id: &str, address_slug: &str) -> String {
        let raw = format!("{}/_next/data/{}/property.json", self.base_url, build_id.value);
        match Url::parse(&raw) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("id", property_id)
                    .append_pair("address", address_slug);
                url.into()
            }
            Err(_) => format!("{raw}?id={property_id}&address={address_slug}"),
        }
    }

    /// End the session. Dropping the client releases its connections.
    pub fn close(self) {
        info!(base_url = %self.base_url, "closing upstream session");
    }

    fn fetch(&self, url: &str, kind: RequestKind) -> Result<String, ScrapeError> {
        with_retries(&self.retry, &self.pacer, url, |attempt| {
            info!(url, attempt, ?kind, "fetching");
            classify(url, self.client.get(url, kind))
        })
    }
}

fn classify(url: &str, result: Result<HttpResponse, HttpFailure>) -> Step<String> {
    match result {
        Ok(resp) if (200..300).contains(&resp.status) => {
            info!(url, status = resp.status, len = resp.body.len(), "fetched");
            Step::Done(resp.body)
        }
        Ok(resp) if resp.status == 404 => {
            warn!(url, "not found (404), not retrying");
            Step::Fail(ScrapeError::NotFound { url: url.to_string() })
        }
        Ok(resp) if resp.status == 403 => {
            warn!(url, "access forbidden (403), likely anti-bot protection");
            Step::Retry(RetryCause::Blocked)
        }
        Ok(resp) => Step::Retry(RetryCause::Status(resp.status)),
        Err(HttpFailure::Timeout(reason)) => Step::Retry(RetryCause::Timeout(reason)),
        Err(HttpFailure::Connection(reason)) => Step::Retry(RetryCause::Transport(reason)),
    }
}
