use chrono::Utc;
use rusqlite::params;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::db::connection::Database;
use crate::db::store::{ListingStore, PersistedRecord, StoreError};
use crate::domain::{Coordinates, NormalizedListing};

/// `listings` table backed by SQLite.
#[derive(Clone)]
pub struct SqliteListingStore {
    db: Database,
}

impl SqliteListingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
            Ok(n)
        })
    }
}

// Out-of-range coordinates are dropped here rather than in the normalizers.
fn storable_coordinates(listing: &NormalizedListing) -> (Option<f64>, Option<f64>) {
    match (listing.latitude, listing.longitude) {
        (Some(lat), Some(lng)) if (Coordinates { lat, lng }).in_range() => (Some(lat), Some(lng)),
        (None, None) => (None, None),
        (lat, lng) => {
            warn!(url = %listing.url, ?lat, ?lng, "dropping out-of-range or partial coordinates");
            (None, None)
        }
    }
}

impl ListingStore for SqliteListingStore {
    fn list_known_ids(&self) -> Result<HashSet<i64>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM listings WHERE id IS NOT NULL")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

            let mut ids = HashSet::new();
            for r in rows {
                ids.insert(r?);
            }
            Ok(ids)
        })
    }

    fn upsert_batch(&self, batch: &[NormalizedListing]) -> Result<Vec<PersistedRecord>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut seen = HashSet::new();
            let mut written = Vec::with_capacity(batch.len());

            for listing in batch {
                if let Some(id) = listing.id {
                    if !seen.insert(id) {
                        debug!(id, "skipping duplicate id within batch");
                        continue;
                    }
                }

                let (latitude, longitude) = storable_coordinates(listing);

                let row_id: i64 = tx.query_row(
                    r#"
                    INSERT INTO listings (
                        id, url, title, listing_type,
                        price_eur, price_period, bedrooms, bathrooms,
                        property_type, ber_rating, latitude, longitude,
                        date_listed, image_url, address_full,
                        inserted_at, updated_at
                    ) VALUES (
                        ?1, ?2, ?3, ?4,
                        ?5, ?6, ?7, ?8,
                        ?9, ?10, ?11, ?12,
                        ?13, ?14, ?15,
                        ?16, ?16
                    )
                    ON CONFLICT(id) DO UPDATE SET
                        url = excluded.url,
                        title = excluded.title,
                        listing_type = excluded.listing_type,
                        price_eur = excluded.price_eur,
                        price_period = excluded.price_period,
                        bedrooms = excluded.bedrooms,
                        bathrooms = excluded.bathrooms,
                        property_type = excluded.property_type,
                        ber_rating = excluded.ber_rating,
                        latitude = excluded.latitude,
                        longitude = excluded.longitude,
                        date_listed = excluded.date_listed,
                        image_url = excluded.image_url,
                        address_full = excluded.address_full,
                        updated_at = excluded.updated_at
                    RETURNING row_id
                    "#,
                    params![
                        listing.id,
                        listing.url,
                        listing.title,
                        listing.listing_type.as_str(),
                        listing.price_eur,
                        listing.price_period.map(|p| p.as_str()),
                        listing.bedrooms,
                        listing.bathrooms,
                        listing.property_type,
                        listing.ber_rating,
                        latitude,
                        longitude,
                        listing.date_listed,
                        listing.image_url,
                        listing.address_full,
                        now,
                    ],
                    |row| row.get(0),
                )?;

                written.push(PersistedRecord {
                    row_id,
                    id: listing.id,
                    url: listing.url.clone(),
                });
            }

            tx.commit()?;
            info!(count = written.len(), "upserted listings");
            Ok(written)
        })
    }
}
