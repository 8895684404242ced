// Handlers: tree get/put/delete, version

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::AppState;
use crate::error::TreeError;
use crate::store::CounterStore;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error body `{"error": "..."}` with 400 for caller mistakes, 500 otherwise.
pub(super) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl From<TreeError> for ApiError {
    fn from(e: TreeError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// GET /version: service name and version from Cargo.toml.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

pub(super) async fn get_root(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.get("")?))
}

pub(super) async fn get_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.store.get(&path)?))
}

pub(super) async fn put_root(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    put(&state.store, "", &body)
}

pub(super) async fn put_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    put(&state.store, &path, &body)
}

/// Nothing is deletable; acknowledged for compatibility with existing clients.
pub(super) async fn delete_path(Path(path): Path<String>) -> String {
    tracing::debug!(path = %path, "DELETE ignored");
    format!("{}: DELETE on path {}", NAME, path)
}

/// Applies the write and responds with the path's new value.
fn put(store: &CounterStore, path: &str, body: &[u8]) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ApiError::bad_request(format!("Failed to decode PUT request body: {}", e))
    })?;
    store.set(path, &value)?;
    Ok(Json(store.get(path)?))
}
