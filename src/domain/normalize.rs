// src/domain/normalize.rs
//
// Pure field normalizers. None of these fail: anything unrecognised comes
// back as `None` or `PriceKind::Unknown`.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use url::Url;

use crate::domain::listing::{Coordinates, PricePeriod};

static RE_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:€\s*)?([\d,]+(?:\.\d{2})?)\s*(?:(?:per\s*)?(month|week|mth|wk|pm|p/m|pw|p/w|perweek))?")
        .unwrap()
});
static RE_BED_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:to|-)\s*(\d+)\s*bed").unwrap());
static RE_BED_SINGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*bed").unwrap());
static RE_BATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*bath").unwrap());

const ON_APPLICATION_PHRASES: [&str; 2] = ["price on application", "contact agent"];
const WEEKS_PER_YEAR: f64 = 52.0;
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceKind {
    Numeric,
    OnApplication,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedPrice {
    pub value: Option<f64>,
    pub kind: PriceKind,
    pub period: Option<PricePeriod>,
}

impl ParsedPrice {
    fn unknown() -> Self {
        Self {
            value: None,
            kind: PriceKind::Unknown,
            period: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedBeds {
    pub min: u32,
    pub max: u32,
    pub is_studio: bool,
}

/// Weekly rents are stored as their monthly equivalent (x 52 / 12, rounded).
/// The weekly figure is not kept anywhere, so every weekly price in the
/// pipeline goes through here and comes out with `PricePeriod::Month`.
pub fn weekly_to_monthly(weekly: f64) -> f64 {
    (weekly * WEEKS_PER_YEAR / MONTHS_PER_YEAR).round()
}

pub fn parse_price(raw: Option<&str>) -> ParsedPrice {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return ParsedPrice::unknown();
    };

    let lower = raw.to_lowercase();

    if ON_APPLICATION_PHRASES.iter().any(|p| lower.contains(p)) {
        return ParsedPrice {
            value: None,
            kind: PriceKind::OnApplication,
            period: None,
        };
    }

    let Some(caps) = RE_PRICE.captures(&lower) else {
        return ParsedPrice::unknown();
    };

    let Some(amount) = caps
        .get(1)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    else {
        return ParsedPrice::unknown();
    };

    match caps.get(2).map(|m| m.as_str()) {
        Some(cadence) if is_weekly(cadence) => ParsedPrice {
            value: Some(weekly_to_monthly(amount)),
            kind: PriceKind::Numeric,
            period: Some(PricePeriod::Month),
        },
        Some(_) => ParsedPrice {
            value: Some(amount),
            kind: PriceKind::Numeric,
            period: Some(PricePeriod::Month),
        },
        None if lower.contains('€') => ParsedPrice {
            value: Some(amount),
            kind: PriceKind::Numeric,
            period: None,
        },
        None => ParsedPrice::unknown(),
    }
}

fn is_weekly(cadence: &str) -> bool {
    cadence.starts_with("week") || cadence.starts_with("wk") || matches!(cadence, "pw" | "p/w" | "perweek")
}

pub fn parse_beds(raw: Option<&str>) -> Option<ParsedBeds> {
    let lower = raw?.to_lowercase();

    if lower.contains("studio") {
        return Some(ParsedBeds {
            min: 1,
            max: 1,
            is_studio: true,
        });
    }

    if let Some(caps) = RE_BED_RANGE.captures(&lower) {
        let a = caps[1].parse::<u32>().ok();
        let b = caps[2].parse::<u32>().ok();
        if let (Some(a), Some(b)) = (a, b) {
            return Some(ParsedBeds {
                min: a.min(b),
                max: a.max(b),
                is_studio: false,
            });
        }
    }

    let n = RE_BED_SINGLE.captures(&lower)?[1].parse::<u32>().ok()?;
    Some(ParsedBeds {
        min: n,
        max: n,
        is_studio: false,
    })
}

pub fn parse_bathrooms(raw: Option<&str>) -> Option<u32> {
    let lower = raw?.to_lowercase();
    RE_BATH.captures(&lower)?[1].parse().ok()
}

/// "BER B2" -> "B2"; the exemption code becomes "Exempt".
pub fn format_ber(raw: Option<&str>) -> Option<String> {
    let cleaned = raw?.replace("BER ", "");
    let cleaned = cleaned.trim();

    match cleaned {
        "" => None,
        "SI_666" => Some("Exempt".to_string()),
        other => Some(other.to_string()),
    }
}

/// Coordinates from a map link. Understands `q=loc:LAT+LNG` and
/// `viewpoint=LAT,LNG`. Values are returned as found, never clamped.
pub fn coordinates_from_map_link(href: &str) -> Option<Coordinates> {
    let url = Url::parse(href)
        .or_else(|_| Url::parse("https://maps.google.com/").and_then(|base| base.join(href)))
        .ok()?;

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let param = |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    param("q")
        .and_then(|q| q.strip_prefix("loc:"))
        .and_then(|loc| split_pair(loc, &[' ', '+']))
        .or_else(|| param("viewpoint").and_then(|vp| split_pair(vp, &[','])))
}

fn split_pair(raw: &str, separators: &[char]) -> Option<Coordinates> {
    let mut parts = raw.trim().splitn(2, |c| separators.contains(&c));
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    let lng = parts.next()?.trim().parse::<f64>().ok()?;
    Some(Coordinates { lat, lng })
}
