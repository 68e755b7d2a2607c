pub mod listing;
pub mod location;
pub mod normalize;

pub use listing::{
    parse_listing_id, Coordinates, ListingCategory, NormalizedListing, PricePeriod, RawCandidate,
};
pub use location::SearchTarget;
