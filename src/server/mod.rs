//! HTTP surface over one shared history store. The mutex is the single writer
//! lock: handlers re-read persisted state under it before touching the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::AppConfig;
use crate::data::history::HistoryStore;

pub mod api;
pub mod routes;

pub type SharedHistory = Arc<Mutex<HistoryStore>>;

pub fn shared(store: HistoryStore) -> SharedHistory {
    Arc::new(Mutex::new(store))
}

/// Lock the store and pull in any writes made outside this process.
pub(crate) fn lock_fresh(state: &SharedHistory) -> MutexGuard<'_, HistoryStore> {
    let mut store = state.lock().unwrap_or_else(PoisonError::into_inner);
    store.refresh();
    store
}

pub async fn run_server(cfg: &AppConfig) -> std::io::Result<()> {
    let store = HistoryStore::open(cfg.history_backend());
    tracing::info!(datasets = store.len(), data_dir = %cfg.data_dir.display(), "history loaded");

    let app = routes::router(shared(store));
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("csvault server listening on http://{}", cfg.bind_addr);
    axum::serve(listener, app).await
}
