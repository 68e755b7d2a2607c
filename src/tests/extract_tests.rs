use crate::domain::{Coordinates, ListingCategory, RawCandidate};
use crate::extract::{
    extract_detail, extract_search_results, DetailSource, ExtractContext, ExtractionStrategy, StrategyPreference,
};
use crate::tests::support::{
    card_html, detail_html, detail_payload, listing_json, markup_page, next_data_html, search_page, BASE,
};
use chrono::{TimeZone, Utc};
use serde_json::json;

fn ctx(max_pages: u32) -> ExtractContext<'static> {
    ExtractContext {
        base_url: BASE,
        category: ListingCategory::Rent,
        max_pages,
    }
}

#[test]
fn structured_page_maps_listings_directly() {
    let page = extract_search_results(&search_page(&[101, 102], 40), &ctx(5), StrategyPreference::StructuredFirst);

    assert_eq!(page.strategy, ExtractionStrategy::Structured);
    assert_eq!(page.total_pages, Some(2));
    assert_eq!(page.candidates.len(), 2);

    let first = &page.candidates[0];
    assert_eq!(first.id.as_deref(), Some("101"));
    assert_eq!(first.url, format!("{BASE}/for-rent/apartment-101-main-street-dublin-2/101"));
    assert_eq!(first.title, "101 Main Street, Dublin 2");
    assert_eq!(first.price_text.as_deref(), Some("€2,000 per month"));
    assert_eq!(first.beds_text.as_deref(), Some("2 Bed"));
    assert_eq!(first.ber_rating.as_deref(), Some("B2"));
    assert_eq!(first.coordinates, Some(Coordinates { lat: 53.3498, lng: -6.2603 }));
    assert_eq!(first.image_url.as_deref(), Some("https://img.test/101-720.jpg"));
}

#[test]
fn huge_result_counts_are_capped() {
    let page = extract_search_results(&search_page(&[1], 1_000_000), &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.total_pages, Some(5));
}

#[test]
fn explicit_total_pages_wins_over_results() {
    let html = next_data_html(&json!({
        "props": { "pageProps": {
            "listings": [ { "listing": listing_json(7) } ],
            "paging": { "totalPages": 3, "totalResults": 999 }
        }}
    }));
    let page = extract_search_results(&html, &ctx(10), StrategyPreference::StructuredFirst);
    assert_eq!(page.total_pages, Some(3));
}

#[test]
fn bad_items_are_skipped_not_fatal() {
    let mut numeric_fields = listing_json(9);
    numeric_fields["numBedrooms"] = json!(3);
    numeric_fields["price"] = json!("€1,200,000");
    numeric_fields["seoFriendlyPath"] = json!(null);
    numeric_fields["daftShortcode"] = json!("2345");

    let html = next_data_html(&json!({
        "props": { "pageProps": {
            "listings": [
                { "listing": "not an object" },
                { "somethingElse": true },
                { "listing": listing_json(8) },
                { "listing": numeric_fields }
            ],
            "paging": { "totalResults": 4 }
        }}
    }));

    let page = extract_search_results(&html, &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.strategy, ExtractionStrategy::Structured);
    assert_eq!(page.candidates.len(), 2);

    let generated = &page.candidates[1];
    assert_eq!(generated.beds_text.as_deref(), Some("3 Bed"));
    assert_eq!(generated.url, format!("{BASE}/property-for-rent/property-2345"));
}

#[test]
fn missing_payload_falls_back_to_markup() {
    let cards = vec![card_html(501, "€1,950 per month"), card_html(502, "€480 per week")];
    let html = markup_page(&cards, "1,234");

    let page = extract_search_results(&html, &ctx(100), StrategyPreference::StructuredFirst);
    assert_eq!(page.strategy, ExtractionStrategy::MarkupFallback);
    assert_eq!(page.total_pages, Some(62));
    assert_eq!(page.candidates.len(), 2);

    let card = &page.candidates[0];
    assert_eq!(card.id.as_deref(), Some("501"));
    assert_eq!(card.url, format!("{BASE}/for-rent/apartment-501-some-road-dublin-4/501"));
    assert_eq!(card.title, "Bright apartment");
    assert_eq!(card.address, "501 Some Road, Dublin 4");
    assert_eq!(card.price_text.as_deref(), Some("€1,950 per month"));
    assert_eq!(card.beds_text.as_deref(), Some("3 Bed"));
    assert_eq!(card.baths_text.as_deref(), Some("2 Bath"));
    assert_eq!(card.property_type.as_deref(), Some("Apartment"));
    assert_eq!(card.ber_rating.as_deref(), Some("C1"));
    assert_eq!(card.coordinates, Some(Coordinates { lat: 53.33, lng: -6.25 }));
    assert_eq!(card.image_url.as_deref(), Some("https://img.test/501.jpg"));
}

#[test]
fn markup_page_count_is_capped() {
    let html = markup_page(&[card_html(1, "€1")], "1,000,000");
    let page = extract_search_results(&html, &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.total_pages, Some(5));
}

#[test]
fn cards_tolerate_missing_fields() {
    let bare = r#"<div data-testid="card-container"><a href="/for-rent/flat/900">x</a></div>"#.to_string();
    let linkless = r#"<div data-testid="card-container"><p>no link here</p></div>"#.to_string();
    let html = markup_page(&[bare, linkless], "2");

    let page = extract_search_results(&html, &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.candidates.len(), 1);

    let card = &page.candidates[0];
    assert_eq!(card.id.as_deref(), Some("900"));
    assert_eq!(card.price_text, None);
    assert_eq!(card.beds_text, None);
    assert_eq!(card.coordinates, None);
}

#[test]
fn markup_only_ignores_the_payload() {
    let mut html = search_page(&[1, 2], 40);
    html = html.replace("</body>", &format!("{}</body>", card_html(77, "€900 per month")));

    let page = extract_search_results(&html, &ctx(5), StrategyPreference::MarkupOnly);
    assert_eq!(page.strategy, ExtractionStrategy::MarkupFallback);
    assert_eq!(page.candidates.len(), 1);
    assert_eq!(page.candidates[0].id.as_deref(), Some("77"));
}

#[test]
fn empty_result_set_stays_structured() {
    let page = extract_search_results(&search_page(&[], 0), &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.strategy, ExtractionStrategy::Structured);
    assert!(page.candidates.is_empty());
    assert_eq!(page.total_pages, Some(0));
}

#[test]
fn page_with_neither_shape_is_empty() {
    let page = extract_search_results("<html><body>maintenance</body></html>", &ctx(5), StrategyPreference::StructuredFirst);
    assert_eq!(page.strategy, ExtractionStrategy::MarkupFallback);
    assert!(page.candidates.is_empty());
    assert_eq!(page.total_pages, None);
}

#[test]
fn detail_payload_fills_gaps_from_search_pass() {
    let existing = RawCandidate {
        id: Some("101".into()),
        url: format!("{BASE}/for-rent/apartment-101-main-street-dublin-2/101"),
        address: "101 Main Street, Dublin 2".into(),
        property_type: Some("Apartment".into()),
        ..RawCandidate::default()
    };
    let mut payload = detail_payload(101);
    payload["pageProps"]["listing"]["propertyType"] = json!(null);

    let merged = extract_detail(DetailSource::Payload(&payload), Some(&existing), &ctx(5)).unwrap();
    assert_eq!(merged.ber_rating.as_deref(), Some("A3"));
    assert_eq!(merged.listed_at, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
    assert_eq!(merged.property_type.as_deref(), Some("Apartment"));

    let empty = json!({ "pageProps": {} });
    assert!(extract_detail(DetailSource::Payload(&empty), Some(&existing), &ctx(5)).is_none());
}

#[test]
fn detail_markup_merges_without_overwriting() {
    let existing = RawCandidate {
        id: Some("501".into()),
        url: format!("{BASE}/for-rent/a/501"),
        ber_rating: Some("C1".into()),
        ..RawCandidate::default()
    };

    let merged = extract_detail(DetailSource::Markup(&detail_html()), Some(&existing), &ctx(5)).unwrap();
    assert_eq!(merged.ber_rating.as_deref(), Some("C1"));
    assert_eq!(merged.coordinates, Some(Coordinates { lat: 53.3, lng: -6.2 }));
    assert_eq!(merged.listed_at, Some(Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap()));

    let fresh = extract_detail(DetailSource::Markup(&detail_html()), None, &ctx(5)).unwrap();
    assert_eq!(fresh.ber_rating.as_deref(), Some("A2"));

    assert!(extract_detail(DetailSource::Markup("<html></html>"), None, &ctx(5)).is_none());
}
