use crate::app::App;
use crate::db::scrapes::get_recent_scrapes;
use crate::errors::ServerError;
use crate::pipeline::{RunSummary, ScrapePlan, ScrapeRequest};
use crate::responses::{json_response, ResultResp};
use astra::Request;
use chrono::Utc;
use serde_json::json;
use std::io::Read;
use tracing::info;

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn handle(req: Request, app: &App) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    match (method.as_str(), path.as_str()) {
        ("GET", "/health") => health(app),

        ("POST", "/scrape") => {
            let plan = read_plan(req)?;
            info!(listing_type = plan.listing_type.as_str(), location = %plan.location, "scrape requested");
            let summary = app.run(&plan);
            json_response(200, &summary)
        }

        ("POST", "/scrape/async") => {
            let plan = read_plan(req)?;
            info!(listing_type = plan.listing_type.as_str(), location = %plan.location, "async scrape requested");
            app.spawn_run(plan);

            let accepted = RunSummary {
                success: true,
                message: "Scraping operation started in background".to_string(),
                count: 0,
                details: None,
                execution_time: None,
                error_kind: None,
            };
            json_response(202, &accepted)
        }

        ("POST", "/scrape/cancel") => {
            if app.cancel_active() {
                json_response(200, &json!({ "success": true, "message": "Cancellation requested" }))
            } else {
                json_response(409, &json!({ "success": false, "message": "No scrape is running" }))
            }
        }

        ("GET", "/scrape/runs") => {
            let runs = app.db.with_conn(|conn| get_recent_scrapes(conn))?;
            json_response(200, &runs)
        }

        _ => Err(ServerError::NotFound),
    }
}

fn health(app: &App) -> ResultResp {
    let database = match app.db.with_conn(|conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }) {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    let healthy = database == "connected";

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": database,
            "scraper": if app.is_running() { "running" } else { "idle" },
        },
    });

    json_response(if healthy { 200 } else { 503 }, &body)
}

fn read_plan(req: Request) -> Result<ScrapePlan, ServerError> {
    let mut raw = String::new();
    req.into_body()
        .reader()
        .take(MAX_BODY_BYTES)
        .read_to_string(&mut raw)
        .map_err(|e| ServerError::BadRequest(format!("unreadable body: {e}")))?;

    let request: ScrapeRequest = serde_json::from_str(&raw)
        .map_err(|e| ServerError::BadRequest(format!("invalid scrape request: {e}")))?;

    request.plan().map_err(ServerError::BadRequest)
}
