// src/domain/location.rs

use crate::domain::listing::ListingCategory;

pub const VALID_LOCATIONS: [&str; 10] = [
    "dublin",
    "dublin-city",
    "cork",
    "cork-city",
    "galway",
    "galway-city",
    "limerick",
    "limerick-city",
    "waterford",
    "waterford-city",
];

pub fn is_valid_location(location: &str) -> bool {
    VALID_LOCATIONS.contains(&location.trim().to_lowercase().as_str())
}

/// Rent searches are keyed by city area, sale searches by county.
pub fn search_location_slug(category: ListingCategory, location: &str) -> &'static str {
    let location = location.trim().to_lowercase();
    match category {
        ListingCategory::Rent => match location.as_str() {
            "cork" | "cork-city" => "cork-city",
            "galway" | "galway-city" => "galway-city",
            "limerick" | "limerick-city" => "limerick-city",
            "waterford" | "waterford-city" => "waterford-city",
            _ => "dublin-city",
        },
        ListingCategory::Sale => match location.as_str() {
            "cork" | "cork-city" => "cork",
            "galway" | "galway-city" => "galway",
            "limerick" | "limerick-city" => "limerick",
            "waterford" | "waterford-city" => "waterford",
            _ => "dublin",
        },
    }
}

/// A result listing for one category and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub category: ListingCategory,
    pub url: String,
}

impl SearchTarget {
    pub fn new(base_url: &str, category: ListingCategory, location: &str) -> Self {
        let url = format!(
            "{}{}/{}",
            base_url.trim_end_matches('/'),
            category.search_path(),
            search_location_slug(category, location)
        );
        Self { category, url }
    }

    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}page={page}", self.url)
    }
}

/// `(property id, address slug)` from a listing URL like
/// `https://host/for-rent/apartment-3-main-street/1234567`.
pub fn property_ref_from_url(base_url: &str, url: &str) -> Option<(String, String)> {
    let relative = url.strip_prefix(base_url.trim_end_matches('/')).unwrap_or(url);
    let relative = relative.split(['?', '#']).next().unwrap_or(relative);
    let parts: Vec<&str> = relative.trim_matches('/').split('/').collect();

    if parts.len() < 3 {
        return None;
    }

    let id = parts[parts.len() - 1];
    let slug = parts[parts.len() - 2];
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || slug.is_empty() {
        return None;
    }
    Some((id.to_string(), slug.to_string()))
}
