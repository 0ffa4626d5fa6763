use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::api;
use crate::server::SharedHistory;

pub fn router(state: SharedHistory) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route(
            "/api/history",
            get(api::list_history).delete(api::clear_history),
        )
        .route("/api/history/exists", get(api::history_exists))
        .route(
            "/api/history/:id",
            get(api::get_dataset).delete(api::delete_dataset),
        )
        .route("/api/validate", post(api::validate_csv))
        .route("/api/import", post(api::import_csv))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
