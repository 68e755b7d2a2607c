// src/domain/listing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::normalize::{parse_bathrooms, parse_beds, parse_price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingCategory {
    Rent,
    Sale,
}

impl ListingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCategory::Rent => "rent",
            ListingCategory::Sale => "sale",
        }
    }

    /// Search path on the upstream site, e.g. `/property-for-rent`.
    pub fn search_path(&self) -> &'static str {
        match self {
            ListingCategory::Rent => "/property-for-rent",
            ListingCategory::Sale => "/property-for-sale",
        }
    }
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rent" => Ok(ListingCategory::Rent),
            "sale" => Ok(ListingCategory::Sale),
            other => Err(format!("unknown listing category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePeriod {
    Week,
    Month,
}

impl PricePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricePeriod::Week => "week",
            PricePeriod::Month => "month",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One listing as found on a result or detail page, before normalization.
/// Missing fields are normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandidate {
    pub id: Option<String>,
    pub url: String,
    pub title: String,
    pub address: String,
    pub price_text: Option<String>,
    pub beds_text: Option<String>,
    pub baths_text: Option<String>,
    pub property_type: Option<String>,
    pub ber_rating: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub image_url: Option<String>,
    pub listed_at: Option<DateTime<Utc>>,
}

impl RawCandidate {
    /// Numeric listing id, if the upstream identifier is one.
    pub fn listing_id(&self) -> Option<i64> {
        self.id.as_deref().and_then(parse_listing_id)
    }

    /// Copy over anything we don't have yet from `other`. Populated fields win.
    pub fn fill_missing_from(&mut self, other: &RawCandidate) {
        fn fill_str(slot: &mut String, from: &str) {
            if slot.trim().is_empty() {
                *slot = from.to_string();
            }
        }
        fn fill<T: Clone>(slot: &mut Option<T>, from: &Option<T>) {
            if slot.is_none() {
                *slot = from.clone();
            }
        }

        fill(&mut self.id, &other.id);
        fill_str(&mut self.url, &other.url);
        fill_str(&mut self.title, &other.title);
        fill_str(&mut self.address, &other.address);
        fill(&mut self.price_text, &other.price_text);
        fill(&mut self.beds_text, &other.beds_text);
        fill(&mut self.baths_text, &other.baths_text);
        fill(&mut self.property_type, &other.property_type);
        fill(&mut self.ber_rating, &other.ber_rating);
        fill(&mut self.coordinates, &other.coordinates);
        fill(&mut self.image_url, &other.image_url);
        fill(&mut self.listed_at, &other.listed_at);
    }
}

pub fn parse_listing_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// The unit handed to the listing store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedListing {
    pub id: Option<i64>,
    pub url: String,
    pub title: String,
    pub listing_type: ListingCategory,
    pub price_eur: Option<f64>,
    pub price_period: Option<PricePeriod>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub property_type: Option<String>,
    pub ber_rating: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub date_listed: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub address_full: String,
}

impl NormalizedListing {
    pub fn from_candidate(candidate: RawCandidate, category: ListingCategory) -> Self {
        let price = parse_price(candidate.price_text.as_deref());
        let beds = parse_beds(candidate.beds_text.as_deref());
        let id = candidate.listing_id();

        let title = if candidate.title.trim().is_empty() {
            candidate.address.clone()
        } else {
            candidate.title
        };

        Self {
            id,
            url: candidate.url,
            title,
            listing_type: category,
            price_eur: price.value,
            price_period: price.period,
            bedrooms: beds.map(|b| b.min),
            bathrooms: parse_bathrooms(candidate.baths_text.as_deref()),
            property_type: candidate.property_type.filter(|t| !t.trim().is_empty()),
            ber_rating: candidate.ber_rating,
            latitude: candidate.coordinates.map(|c| c.lat),
            longitude: candidate.coordinates.map(|c| c.lng),
            date_listed: candidate.listed_at,
            image_url: candidate.image_url,
            address_full: candidate.address,
        }
    }
}
