use serde::Deserialize;
use serde_json::Value;

// Search page __NEXT_DATA__
//  └── props
//       └── pageProps
//            ├── listings[]
//            │    └── listing        (ListingJson)
//            └── paging
//                 ├── totalResults
//                 ├── totalPages
//                 └── pageSize
//
// Detail API payload (/_next/data/<buildId>/property.json)
//  └── pageProps
//       └── listing                  (ListingJson)

#[derive(Debug, Deserialize)]
pub struct NextData {
    pub props: Option<Props>,
}

#[derive(Debug, Deserialize)]
pub struct Props {
    #[serde(rename = "pageProps")]
    pub page_props: Option<SearchPageProps>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchPageProps {
    // Items stay untyped so one malformed listing can't sink the page.
    #[serde(default)]
    pub listings: Vec<Value>,
    pub paging: Option<Paging>,
    pub pagination: Option<Paging>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub total_results: Option<u64>,
    pub total_pages: Option<u64>,
    pub page_size: Option<u64>,
    pub results_per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub listing: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DetailPayload {
    #[serde(rename = "pageProps")]
    pub page_props: Option<DetailPageProps>,
}

#[derive(Debug, Deserialize)]
pub struct DetailPageProps {
    pub listing: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingJson {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub price: Option<Value>,
    pub num_bedrooms: Option<Value>,
    pub num_bathrooms: Option<Value>,
    pub property_type: Option<String>,
    pub daft_shortcode: Option<Value>,
    pub seo_friendly_path: Option<String>,
    pub point: Option<Point>,
    pub location: Option<LatLon>,
    pub media: Option<Media>,
    pub publish_date: Option<Value>,
    pub ber: Option<BerField>,
}

#[derive(Debug, Deserialize)]
pub struct Point {
    // GeoJSON order: [lng, lat]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LatLon {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub images: Vec<ImageSizes>,
}

#[derive(Debug, Deserialize)]
pub struct ImageSizes {
    #[serde(rename = "size720x480")]
    pub size_720x480: Option<String>,
    #[serde(rename = "size600x600")]
    pub size_600x600: Option<String>,
    #[serde(rename = "size400x300")]
    pub size_400x300: Option<String>,
    #[serde(rename = "size360x240")]
    pub size_360x240: Option<String>,
    #[serde(rename = "size300x200")]
    pub size_300x200: Option<String>,
}

impl ImageSizes {
    pub fn best(&self) -> Option<&str> {
        [
            &self.size_720x480,
            &self.size_600x600,
            &self.size_400x300,
            &self.size_360x240,
            &self.size_300x200,
        ]
        .into_iter()
        .find_map(|s| s.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BerField {
    Rated { rating: Option<String> },
    Label(String),
}

/// Strings and numbers both show up for the same field depending on the page.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
