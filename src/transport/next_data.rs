use scraper::{Html, Selector};
use serde_json::Value;
use thiserror::Error;

/// `<script id="__NEXT_DATA__">` holds the page's structured payload.
pub const NEXT_DATA_SELECTOR: &str = r#"script[id="__NEXT_DATA__"]"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddedError {
    #[error("__NEXT_DATA__ not found")]
    MissingMarker,
    #[error("__NEXT_DATA__ is not valid JSON: {0}")]
    InvalidJson(String),
}

pub fn extract_next_data(html: &str) -> Result<Value, EmbeddedError> {
    let document = Html::parse_document(html);
    next_data_in(&document)
}

pub fn next_data_in(document: &Html) -> Result<Value, EmbeddedError> {
    let selector = Selector::parse(NEXT_DATA_SELECTOR).map_err(|_| EmbeddedError::MissingMarker)?;

    let element = document
        .select(&selector)
        .next()
        .ok_or(EmbeddedError::MissingMarker)?;

    let json_text: String = element.text().collect();
    if json_text.trim().is_empty() {
        return Err(EmbeddedError::MissingMarker);
    }

    serde_json::from_str(&json_text).map_err(|e| EmbeddedError::InvalidJson(e.to_string()))
}
