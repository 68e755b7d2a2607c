mod markup;
mod models;
pub mod search;
mod structured;

pub use search::{
    extract_detail, extract_search_results, DetailSource, ExtractContext, ExtractionStrategy,
    StrategyPreference,
};
