use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::StoreError;

/// Bookkeeping row for one triggered category run.
#[derive(Debug, Serialize)]
pub struct ScrapeRun {
    pub id: i64,
    pub listing_type: String,
    pub location: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub pages_walked: Option<i64>,
    pub records_persisted: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_scrape_run(
    conn: &Connection,
    listing_type: &str,
    location: &str,
    now: i64,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO scrape_runs (listing_type, location, started_at, success) VALUES (?, ?, ?, 0)",
        params![listing_type, location, now],
    )?;
    Ok(conn.last_insert_rowid())
}

#[allow(clippy::too_many_arguments)]
pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    pages: u32,
    records: usize,
    success: bool,
    error: Option<&str>,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, pages_walked = ?, records_persisted = ?, success = ?, error_message = ? WHERE id = ?",
        params![now, pages, records as i64, success, error, run_id],
    )?;
    if updated == 0 {
        return Err(StoreError::Rejected(format!("no scrape run with id {run_id}")));
    }
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, listing_type, location, started_at, finished_at, pages_walked, records_persisted, success, error_message
         FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            listing_type: row.get(1)?,
            location: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            pages_walked: row.get(5)?,
            records_persisted: row.get(6)?,
            success: row.get(7)?,
            error_message: row.get(8)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}
