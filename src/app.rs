// app.rs
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::config::{Config, ScrapeSettings};
use crate::db::scrapes::{end_scrape_run, start_scrape_run};
use crate::db::{Database, SqliteListingStore};
use crate::errors::ErrorKind;
use crate::pipeline::{run_plan, CancelToken, RunSummary, ScrapePlan};
use crate::transport::{HttpClient, Pacer, ReqwestClient, ThreadPacer, Transport};

/// Opens a fresh upstream session for one run.
pub type Connector =
    Arc<dyn Fn(&ScrapeSettings) -> Result<Box<dyn HttpClient>, String> + Send + Sync>;

/// Everything a request handler needs. Cheap to clone; clones share the run
/// gate, so at most one run talks to upstream at a time.
#[derive(Clone)]
pub struct App {
    pub settings: ScrapeSettings,
    pub db: Database,
    connect: Connector,
    pacer: Arc<dyn Pacer + Send + Sync>,
    run_gate: Arc<Mutex<()>>,
    active: Arc<Mutex<Option<CancelToken>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl App {
    pub fn new(config: &Config, db: Database) -> Self {
        let connect: Connector = Arc::new(|settings: &ScrapeSettings| {
            ReqwestClient::new(settings)
                .map(|c| Box::new(c) as Box<dyn HttpClient>)
                .map_err(|e| e.to_string())
        });
        Self::with_connector(config.scrape_settings(), db, connect, Arc::new(ThreadPacer))
    }

    pub fn with_connector(
        settings: ScrapeSettings,
        db: Database,
        connect: Connector,
        pacer: Arc<dyn Pacer + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            db,
            connect,
            pacer,
            run_gate: Arc::new(Mutex::new(())),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> SqliteListingStore {
        SqliteListingStore::new(self.db.clone())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Ask the active run to stop. False when nothing is running.
    pub fn cancel_active(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run a plan to completion, waiting for any earlier run to finish first.
    pub fn run(&self, plan: &ScrapePlan) -> RunSummary {
        let _gate = lock(&self.run_gate);

        let cancel = CancelToken::new();
        *lock(&self.active) = Some(cancel.clone());

        let run_id = self
            .db
            .with_conn(|conn| {
                start_scrape_run(conn, plan.listing_type.as_str(), &plan.location, Utc::now().timestamp())
            })
            .map_err(|e| warn!(error = %e, "could not record scrape run start"))
            .ok();

        let summary = match (self.connect)(&self.settings) {
            Ok(client) => {
                let transport = Transport::new(client, self.pacer.clone(), &self.settings);
                let summary = run_plan(&transport, &self.store(), &self.settings, &cancel, plan);
                transport.close();
                summary
            }
            Err(e) => {
                error!(error = %e, "could not open upstream session");
                RunSummary::failure(ErrorKind::NetworkError, format!("Failed to open upstream session: {e}"))
            }
        };

        if let Some(run_id) = run_id {
            let error = (!summary.success).then_some(summary.message.as_str());
            let recorded = self.db.with_conn(|conn| {
                end_scrape_run(
                    conn,
                    run_id,
                    Utc::now().timestamp(),
                    summary.pages_walked(),
                    summary.count,
                    summary.success,
                    error,
                )
            });
            if let Err(e) = recorded {
                warn!(run_id, error = %e, "could not record scrape run end");
            }
        }

        *lock(&self.active) = None;
        info!(success = summary.success, count = summary.count, "✅ scrape run complete");
        summary
    }

    /// Start a run on its own thread and return immediately.
    pub fn spawn_run(&self, plan: ScrapePlan) {
        let app = self.clone();
        std::thread::spawn(move || {
            info!(listing_type = plan.listing_type.as_str(), "🧵 background scrape started");
            let summary = app.run(&plan);
            info!(success = summary.success, count = summary.count, message = %summary.message, "background scrape finished");
        });
    }
}
