pub mod batch;
pub mod cancel;
pub mod dedup;
pub mod orchestrator;
pub mod request;
pub mod summary;

pub use cancel::CancelToken;
pub use request::{run_plan, ScrapePlan, ScrapeRequest};
pub use summary::RunSummary;
