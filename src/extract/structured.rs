// Structured (__NEXT_DATA__) extraction.

use chrono::{DateTime, TimeZone, Utc};
use scraper::Html;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::normalize::format_ber;
use crate::domain::{Coordinates, RawCandidate};
use crate::extract::models::{
    value_text, BerField, DetailPayload, ListingJson, NextData, Paging, SearchItem, SearchPageProps,
};
use crate::extract::search::{cap_pages, ExtractContext, DEFAULT_PAGE_SIZE};
use crate::transport::next_data_in;

/// The search payload of a page, if it carries listings or paging data.
/// An empty result set with a count is still a structured page.
pub fn search_props(document: &Html) -> Result<SearchPageProps, String> {
    let data = next_data_in(document).map_err(|e| e.to_string())?;
    let next: NextData = serde_json::from_value(data).map_err(|e| format!("unexpected __NEXT_DATA__ shape: {e}"))?;

    let props = next
        .props
        .and_then(|p| p.page_props)
        .ok_or_else(|| "pageProps missing".to_string())?;

    if props.listings.is_empty() && props.paging.is_none() && props.pagination.is_none() {
        return Err("neither listings nor paging in __NEXT_DATA__".to_string());
    }
    Ok(props)
}

pub fn search_candidates(props: &SearchPageProps, ctx: &ExtractContext) -> Vec<RawCandidate> {
    info!(count = props.listings.len(), "found listings in __NEXT_DATA__");

    let mut out = Vec::with_capacity(props.listings.len());
    for (index, item) in props.listings.iter().enumerate() {
        let listing = match serde_json::from_value::<SearchItem>(item.clone()) {
            Ok(SearchItem { listing: Some(listing) }) => listing,
            Ok(_) => {
                warn!(index, "search item without a listing object, skipping");
                continue;
            }
            Err(e) => {
                warn!(index, error = %e, "malformed search item, skipping");
                continue;
            }
        };

        match candidate_from_listing(&listing, ctx) {
            Ok(candidate) => out.push(candidate),
            Err(e) => warn!(index, error = %e, "failed to parse listing, skipping"),
        }
    }

    info!(parsed = out.len(), "parsed listings from __NEXT_DATA__");
    out
}

/// Page count from `paging` (or `pagination`), capped at `ctx.max_pages`.
pub fn total_pages(props: &SearchPageProps, ctx: &ExtractContext) -> Option<u32> {
    let paging: &Paging = props.paging.as_ref().or(props.pagination.as_ref())?;

    if let Some(pages) = paging.total_pages {
        return Some(cap_pages(pages, ctx.max_pages));
    }

    let total = paging.total_results?;
    let per_page = paging
        .page_size
        .or(paging.results_per_page)
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    Some(cap_pages(total.div_ceil(per_page), ctx.max_pages))
}

/// Candidate from a detail API payload (`pageProps.listing`).
pub fn detail_candidate(payload: &Value, ctx: &ExtractContext) -> Option<RawCandidate> {
    let detail: DetailPayload = match serde_json::from_value(payload.clone()) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "unexpected detail payload shape");
            return None;
        }
    };

    let Some(listing) = detail.page_props.and_then(|p| p.listing) else {
        warn!("no listing found in property details JSON");
        return None;
    };

    match candidate_from_listing(&listing, ctx) {
        Ok(c) => Some(c),
        Err(e) => {
            warn!(error = %e, "failed to parse detail listing");
            None
        }
    }
}

pub fn candidate_from_listing(listing: &Value, ctx: &ExtractContext) -> Result<RawCandidate, serde_json::Error> {
    let listing: ListingJson = serde_json::from_value(listing.clone())?;

    let id = listing.id.as_ref().and_then(value_text);
    let title = listing.title.clone().unwrap_or_default();

    let url = match listing.seo_friendly_path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => format!("{}{}", ctx.base_url, path),
        None => {
            let code = listing
                .daft_shortcode
                .as_ref()
                .and_then(value_text)
                .or_else(|| id.clone())
                .unwrap_or_default();
            format!("{}{}/property-{}", ctx.base_url, ctx.category.search_path(), code)
        }
    };

    Ok(RawCandidate {
        id,
        url,
        address: title.clone(),
        title,
        price_text: listing.price.as_ref().and_then(value_text),
        beds_text: listing.num_bedrooms.as_ref().and_then(|v| counted(v, "Bed")),
        baths_text: listing.num_bathrooms.as_ref().and_then(|v| counted(v, "Bath")),
        property_type: listing.property_type.clone().filter(|t| !t.is_empty()),
        ber_rating: ber_rating(listing.ber.as_ref()),
        coordinates: coordinates(&listing),
        image_url: listing
            .media
            .as_ref()
            .and_then(|m| m.images.first())
            .and_then(|img| img.best())
            .map(str::to_string),
        listed_at: listing.publish_date.as_ref().and_then(publish_date),
    })
}

// Bare numbers get a unit so the text normalizers can read them.
fn counted(value: &Value, unit: &str) -> Option<String> {
    match value {
        Value::Number(n) => Some(format!("{n} {unit}")),
        other => value_text(other),
    }
}

fn ber_rating(ber: Option<&BerField>) -> Option<String> {
    match ber? {
        BerField::Rated { rating } => format_ber(rating.as_deref()),
        BerField::Label(label) => format_ber(Some(label.as_str())),
    }
}

fn coordinates(listing: &ListingJson) -> Option<Coordinates> {
    if let Some(point) = &listing.point {
        if let &[lng, lat, ..] = point.coordinates.as_slice() {
            return Some(Coordinates { lat, lng });
        }
    }
    let loc = listing.location.as_ref()?;
    Some(Coordinates {
        lat: loc.lat?,
        lng: loc.lon?,
    })
}

fn publish_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}
