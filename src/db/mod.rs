pub mod connection;
pub mod listings;
pub mod scrapes;
pub mod store;

pub use connection::{init_db, Database};
pub use listings::SqliteListingStore;
pub use store::{ListingStore, StoreError};
