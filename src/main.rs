use crate::app::App;
use crate::config::Config;
use crate::db::{init_db, Database};
use crate::responses::error_to_response;
use crate::router::handle;
use astra::Server;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod db;
mod domain;
mod errors;
mod extract;
mod pipeline;
mod responses;
mod router;
mod transport;

#[cfg(test)]
mod tests;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    // 1️⃣ Load configuration; the database path is the one hard requirement
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("❌ Configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.log_level);

    // 2️⃣ Create the database handle and apply the schema
    let db = Database::new(config.database_path.clone());
    if let Err(e) = init_db(&db, "sql/schema.sql") {
        error!("❌ Database initialization failed: {e}");
        std::process::exit(1);
    }

    // 3️⃣ Start the server
    let app = App::new(&config, db);
    let addr = config.bind_addr;
    info!(%addr, base_url = %config.base_url, "Starting server");

    let server = Server::bind(&addr).max_workers(8);

    let result = server.serve(move |req, _info| match handle(req, &app) {
        Ok(resp) => resp,
        Err(err) => error_to_response(err),
    });

    if let Err(e) = result {
        error!("Server ended with error: {e}");
    }

    info!("Server shut down cleanly.");
}
