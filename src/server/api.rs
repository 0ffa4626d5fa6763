use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::data::dataset::{Dataset, DatasetSummary};
use crate::data::import::{parse_csv, ImportError, ImportOutcome, Importer, Preapproved};
use crate::data::validate::{validate, ValidationReport};
use crate::server::{lock_fresh, SharedHistory};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("no dataset with id '{0}'")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Import(ImportError::NotCsv { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Import(ImportError::Parse(_)) => StatusCode::BAD_REQUEST,
            Self::Import(ImportError::Read { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = json!({
            "status": "error",
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvault-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_history(State(state): State<SharedHistory>) -> Json<Vec<DatasetSummary>> {
    let store = lock_fresh(&state);
    Json(store.usage_history().iter().map(Dataset::summary).collect())
}

pub async fn get_dataset(
    State(state): State<SharedHistory>,
    Path(id): Path<String>,
) -> Result<Json<Dataset>, ApiError> {
    let store = lock_fresh(&state);
    store
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

#[derive(Debug, Deserialize)]
pub struct ExistsParams {
    pub filename: String,
}

pub async fn history_exists(
    State(state): State<SharedHistory>,
    Query(params): Query<ExistsParams>,
) -> Json<Value> {
    let store = lock_fresh(&state);
    let duplicate = store.is_duplicate(&params.filename);
    Json(json!({ "filename": params.filename, "duplicate": duplicate }))
}

pub async fn validate_csv(body: String) -> Result<Json<ValidationReport>, ApiError> {
    let rows = parse_csv(&body)?;
    Ok(Json(validate(&rows)))
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub filename: String,
    #[serde(default)]
    pub replace: bool,
}

/// `replace=true` is the caller's recorded confirmation for overwriting an
/// existing filename; without it a duplicate upload is answered with 409.
pub async fn import_csv(
    State(state): State<SharedHistory>,
    Query(params): Query<ImportParams>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let mut store = lock_fresh(&state);
    let outcome = Importer::new(&mut store, Preapproved(params.replace)).import(
        &params.filename,
        content_type,
        &body,
    )?;

    let response = match outcome {
        ImportOutcome::Declined { filename } => (
            StatusCode::CONFLICT,
            json!({
                "status": "confirm_replace",
                "filename": filename,
                "message": "a dataset with this filename already exists; resend with replace=true to overwrite it",
            }),
        ),
        ImportOutcome::Rejected { report } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "status": "rejected",
                "summary": report.to_string(),
                "report": report,
            }),
        ),
        ImportOutcome::Committed {
            dataset,
            report,
            replaced,
            persist_warning,
        } => (
            StatusCode::CREATED,
            json!({
                "status": "committed",
                "dataset": dataset.summary(),
                "replaced": replaced,
                "summary": report.to_string(),
                "report": report,
                "persist_warning": persist_warning,
            }),
        ),
    };
    Ok((response.0, Json(response.1)))
}

pub async fn delete_dataset(
    State(state): State<SharedHistory>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut store = lock_fresh(&state);
    if store.get(&id).is_none() {
        return Err(ApiError::NotFound(id));
    }
    let deleted = store.delete_entry(&id);
    Ok(Json(json!({
        "status": "deleted",
        "id": id,
        "persist_warning": deleted.warning_message(),
    })))
}

pub async fn clear_history(State(state): State<SharedHistory>) -> Json<Value> {
    let mut store = lock_fresh(&state);
    let cleared = store.clear_history();
    Json(json!({
        "status": "cleared",
        "persist_warning": cleared.warning_message(),
    }))
}
