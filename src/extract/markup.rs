// Markup fallback: listing cards and detail pages parsed with CSS selectors.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::domain::normalize::{coordinates_from_map_link, format_ber};
use crate::domain::RawCandidate;
use crate::extract::search::{cap_pages, ExtractContext, DEFAULT_PAGE_SIZE};

static RE_TOTAL_RESULTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,]+)\s*total\s+results").unwrap());
static RE_LISTED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());

const CARD: &str = r#"[data-testid="card-container"]"#;
const ADDRESS: &str = r#"div[data-tracking="srp_address"] p"#;
const TAGLINE: &str = r#"div[data-tracking="srp_tagline"] p"#;
const PRICE: &str = r#"div[data-tracking="srp_price"] p"#;
const META_SPANS: &str = r#"div[data-tracking="srp_meta"] span"#;
const MAP_LINK: &str = r#"a[data-testid="satelite-button"]"#;
const DATE_LISTED: &str = r#"[data-testid="date-listed"]"#;

const CARD_BER: [&str; 3] = [
    r#"div[data-testid="callout-container"] [aria-label^="BER"]"#,
    r#"div[data-tracking="srp_ber"]"#,
    r#"p[data-testid="ber"]"#,
];
const DETAIL_BER: [&str; 3] = [
    r#"div[data-testid="callout-container"] [aria-label^="BER"]"#,
    r#"p[data-testid="ber"]"#,
    r#"div[data-testid="ber-container"] p"#,
];

const PROPERTY_TYPES: [&str; 7] = [
    "apartment",
    "house",
    "duplex",
    "terrace",
    "detached",
    "semi-detached",
    "studio",
];

pub fn search_candidates(document: &Html, ctx: &ExtractContext) -> Vec<RawCandidate> {
    let root = document.root_element();
    let cards = select_all(root, CARD);

    let mut out = Vec::with_capacity(cards.len());
    for (index, card) in cards.into_iter().enumerate() {
        match card_candidate(card, ctx) {
            Ok(candidate) => out.push(candidate),
            Err(reason) => warn!(index, reason, "skipping listing card"),
        }
    }

    info!(parsed = out.len(), "parsed listing cards from markup");
    out
}

/// "1 - 20 of 3,456 total results" -> pages of twenty, capped.
pub fn total_pages(document: &Html, ctx: &ExtractContext) -> Option<u32> {
    let text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    let caps = RE_TOTAL_RESULTS.captures(&text)?;
    let total: u64 = caps[1].replace(',', "").parse().ok()?;

    info!(total, "found total results string");
    Some(cap_pages(total.div_ceil(DEFAULT_PAGE_SIZE), ctx.max_pages))
}

fn card_candidate(card: ElementRef, ctx: &ExtractContext) -> Result<RawCandidate, &'static str> {
    let href = select_all(card, "a")
        .into_iter()
        .find_map(|a| a.value().attr("href"))
        .filter(|h| !h.is_empty())
        .ok_or("no listing link")?;

    let url = if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", ctx.base_url, href)
    };
    let id = href
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut beds_text = None;
    let mut baths_text = None;
    let mut property_type = None;
    for span in select_all(card, META_SPANS) {
        let text = text_of(span);
        if text.contains("Bed") {
            beds_text = Some(text);
        } else if text.contains("Bath") {
            baths_text = Some(text);
        } else if PROPERTY_TYPES.iter().any(|t| text.to_lowercase().contains(t)) {
            property_type = Some(text);
        }
    }

    Ok(RawCandidate {
        id,
        url,
        title: select_text(card, TAGLINE).unwrap_or_default(),
        address: select_text(card, ADDRESS).unwrap_or_default(),
        price_text: select_text(card, PRICE),
        beds_text,
        baths_text,
        property_type,
        ber_rating: ber_from(card, &CARD_BER),
        coordinates: select_first(card, MAP_LINK)
            .and_then(|a| a.value().attr("href"))
            .and_then(coordinates_from_map_link),
        image_url: select_first(card, "img").and_then(|img| {
            img.value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }),
        listed_at: None,
    })
}

/// Fill in what a detail page adds. Fields already set are left alone.
pub fn merge_detail(document: &Html, candidate: &mut RawCandidate) {
    let root = document.root_element();

    if candidate.coordinates.is_none() {
        candidate.coordinates = select_first(root, MAP_LINK)
            .and_then(|a| a.value().attr("href"))
            .and_then(coordinates_from_map_link);
    }

    if candidate.ber_rating.is_none() {
        candidate.ber_rating = ber_from(root, &DETAIL_BER);
    }

    if candidate.listed_at.is_none() {
        candidate.listed_at = select_text(root, DATE_LISTED).and_then(|t| listed_date(&t));
    }
}

fn ber_from(scope: ElementRef, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| {
        let el = select_first(scope, css)?;
        let label = el
            .value()
            .attr("aria-label")
            .map(str::to_string)
            .unwrap_or_else(|| text_of(el));
        format_ber(Some(label.as_str()))
    })
}

// dd/mm/yyyy, as shown on detail pages
fn listed_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = RE_LISTED_DATE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = scope.select(&selector).next();
    found
}

fn select_text(scope: ElementRef, css: &str) -> Option<String> {
    select_first(scope, css)
        .map(text_of)
        .filter(|t| !t.is_empty())
}

fn text_of(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
