//! Upload Routes
//!
//! `POST /upload` accepts a raw JSON document or a multipart form carrying
//! one JSON file.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    routing::post,
};
use http::{HeaderMap, header};

use crate::core::{Result, ServerError, ServerState};
use crate::ingest::{self, UploadParams, UploadResponse};

pub fn router() -> Router<ServerState> {
    Router::new().route("/upload", post(upload))
}

/// Upload handler
///
/// Persisting and scheduling run in their own task: a client that hangs up
/// mid-request cannot cancel a shot that is already being saved.
async fn upload(
    State(state): State<ServerState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let response = tokio::spawn(ingest::accept(state, content_type, body, params))
        .await
        .map_err(|e| ServerError::Internal(e.into()))??;

    Ok(Json(response))
}
