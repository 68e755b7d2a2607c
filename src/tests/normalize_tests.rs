use crate::domain::location::{property_ref_from_url, search_location_slug};
use crate::domain::normalize::{
    coordinates_from_map_link, format_ber, parse_bathrooms, parse_beds, parse_price, weekly_to_monthly,
    ParsedBeds, PriceKind,
};
use crate::domain::{parse_listing_id, ListingCategory, NormalizedListing, PricePeriod, RawCandidate, SearchTarget};

#[test]
fn weekly_prices_become_monthly() {
    for weekly in [100u32, 250, 333, 451, 1234] {
        let raw = format!("€{weekly} per week");
        let parsed = parse_price(Some(raw.as_str()));
        let expected = (f64::from(weekly) * 52.0 / 12.0).round();

        assert_eq!(parsed.value, Some(expected), "weekly {weekly}");
        assert_eq!(parsed.period, Some(PricePeriod::Month));
        assert_eq!(parsed.kind, PriceKind::Numeric);
    }
    assert_eq!(weekly_to_monthly(450.0), 1950.0);
}

#[test]
fn monthly_price_keeps_value_and_period() {
    let parsed = parse_price(Some("€1,850 per month"));
    assert_eq!(parsed.value, Some(1850.0));
    assert_eq!(parsed.period, Some(PricePeriod::Month));
}

#[test]
fn sale_price_has_no_period() {
    let parsed = parse_price(Some("€425,000"));
    assert_eq!(parsed.value, Some(425_000.0));
    assert_eq!(parsed.kind, PriceKind::Numeric);
    assert_eq!(parsed.period, None);
}

#[test]
fn on_application_in_any_case() {
    for raw in ["Price On Application", "PRICE ON APPLICATION", "Contact agent for details", "CONTACT AGENT"] {
        let parsed = parse_price(Some(raw));
        assert_eq!(parsed.kind, PriceKind::OnApplication, "{raw}");
        assert_eq!(parsed.value, None);
        assert_eq!(parsed.period, None);
    }
}

#[test]
fn unreadable_price_is_unknown() {
    assert_eq!(parse_price(None).kind, PriceKind::Unknown);
    assert_eq!(parse_price(Some("   ")).kind, PriceKind::Unknown);
    assert_eq!(parse_price(Some("ask us")).kind, PriceKind::Unknown);
    // a bare number with neither currency nor cadence
    assert_eq!(parse_price(Some("1200")).value, None);
}

#[test]
fn bedroom_ranges_are_ordered() {
    assert_eq!(
        parse_beds(Some("2 to 4 Bed")),
        Some(ParsedBeds { min: 2, max: 4, is_studio: false })
    );
    assert_eq!(
        parse_beds(Some("4-2 Bed")),
        Some(ParsedBeds { min: 2, max: 4, is_studio: false })
    );
    assert_eq!(
        parse_beds(Some("3 Bed")),
        Some(ParsedBeds { min: 3, max: 3, is_studio: false })
    );
}

#[test]
fn studio_wins_regardless_of_surroundings() {
    let studio = Some(ParsedBeds { min: 1, max: 1, is_studio: true });
    assert_eq!(parse_beds(Some("Studio")), studio);
    assert_eq!(parse_beds(Some("Spacious STUDIO apartment, 1 Bed")), studio);
    assert_eq!(parse_beds(Some("Large house")), None);
    assert_eq!(parse_beds(None), None);
}

#[test]
fn bathrooms() {
    assert_eq!(parse_bathrooms(Some("2 Bath")), Some(2));
    assert_eq!(parse_bathrooms(Some("1 bathroom")), Some(1));
    assert_eq!(parse_bathrooms(Some("en-suite")), None);
}

#[test]
fn ber_labels() {
    assert_eq!(format_ber(Some("BER B2")).as_deref(), Some("B2"));
    assert_eq!(format_ber(Some("SI_666")).as_deref(), Some("Exempt"));
    assert_eq!(format_ber(Some("BER SI_666")).as_deref(), Some("Exempt"));
    assert_eq!(format_ber(Some("A1")).as_deref(), Some("A1"));
    assert_eq!(format_ber(Some("BER ")), None);
    assert_eq!(format_ber(None), None);
}

#[test]
fn coordinates_from_either_encoding() {
    let loc = coordinates_from_map_link("https://www.google.com/maps/search/?api=1&q=loc:53.3498+-6.2603").unwrap();
    assert_eq!((loc.lat, loc.lng), (53.3498, -6.2603));

    let vp = coordinates_from_map_link("https://www.google.com/maps/@?api=1&map_action=map&viewpoint=51.89,-8.47").unwrap();
    assert_eq!((vp.lat, vp.lng), (51.89, -8.47));

    assert!(coordinates_from_map_link("https://www.google.com/maps").is_none());
}

#[test]
fn out_of_range_coordinates_pass_through() {
    let c = coordinates_from_map_link("https://maps.test/?q=loc:95.5+-200.25").unwrap();
    assert_eq!((c.lat, c.lng), (95.5, -200.25));
    assert!(!c.in_range());
}

#[test]
fn listing_ids_must_be_numeric() {
    assert_eq!(parse_listing_id("5123456"), Some(5_123_456));
    assert_eq!(parse_listing_id(" 42 "), Some(42));
    assert_eq!(parse_listing_id("property-42"), None);
    assert_eq!(parse_listing_id(""), None);
}

#[test]
fn normalized_listing_from_candidate() {
    let candidate = RawCandidate {
        id: Some("77".into()),
        url: "https://daft.test/for-rent/x/77".into(),
        title: "  ".into(),
        address: "77 Canal Road, Dublin 6".into(),
        price_text: Some("€300 per week".into()),
        beds_text: Some("1 to 3 Bed".into()),
        baths_text: Some("2 Bath".into()),
        ber_rating: Some("C3".into()),
        ..RawCandidate::default()
    };

    let listing = NormalizedListing::from_candidate(candidate, ListingCategory::Rent);
    assert_eq!(listing.id, Some(77));
    assert_eq!(listing.title, "77 Canal Road, Dublin 6");
    assert_eq!(listing.price_eur, Some(1300.0));
    assert_eq!(listing.price_period, Some(PricePeriod::Month));
    assert_eq!(listing.bedrooms, Some(1));
    assert_eq!(listing.bathrooms, Some(2));
    assert_eq!(listing.ber_rating.as_deref(), Some("C3"));
    assert_eq!(listing.latitude, None);
}

#[test]
fn search_targets_per_category() {
    let rent = SearchTarget::new("https://daft.test/", ListingCategory::Rent, "Dublin");
    assert_eq!(rent.url, "https://daft.test/property-for-rent/dublin-city");
    assert_eq!(rent.page_url(1), rent.url);
    assert_eq!(rent.page_url(3), "https://daft.test/property-for-rent/dublin-city?page=3");

    let sale = SearchTarget::new("https://daft.test", ListingCategory::Sale, "cork-city");
    assert_eq!(sale.url, "https://daft.test/property-for-sale/cork");

    assert_eq!(search_location_slug(ListingCategory::Rent, "nowhere"), "dublin-city");
    assert_eq!(search_location_slug(ListingCategory::Sale, "galway-city"), "galway");
}

#[test]
fn property_reference_needs_numeric_id() {
    assert_eq!(
        property_ref_from_url("https://daft.test", "https://daft.test/for-rent/apartment-1-main-st/123456?ref=x"),
        Some(("123456".to_string(), "apartment-1-main-st".to_string()))
    );
    assert_eq!(property_ref_from_url("https://daft.test", "https://daft.test/for-rent/123456"), None);
    assert_eq!(property_ref_from_url("https://daft.test", "https://daft.test/for-rent/a/b/not-an-id"), None);
}
