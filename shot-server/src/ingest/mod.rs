//! Shot ingestion
//!
//! Synchronous half of an upload: decode the body, validate it as JSON,
//! persist it verbatim under a fresh id and schedule the background
//! pipeline. Everything after [`accept`] returns is best-effort.

pub mod id;
pub mod multipart;

pub use id::{ShotId, ShotIdGenerator};
pub use multipart::{MultipartError, extract_json_file};

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{ShotSummary, UploadKind};

use crate::core::{Result, ServerError, ServerState};
use crate::pipeline::{self, PendingShot};
use crate::render::receipt::UNKNOWN_MACHINE;

/// Upload query parameters sent by the machine plugin
#[derive(Debug, Clone, Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_machine_id")]
    pub machine_id: String,
    #[serde(default = "default_plugin_version")]
    pub plugin_version: String,
}

fn default_machine_id() -> String {
    UNKNOWN_MACHINE.to_string()
}

fn default_plugin_version() -> String {
    "unknown".to_string()
}

impl Default for UploadParams {
    fn default() -> Self {
        Self {
            machine_id: default_machine_id(),
            plugin_version: default_plugin_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub id: i64,
    pub message: String,
    pub timestamp: String,
    pub auto_printed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_type: Option<UploadKind>,
}

/// Pick the shot document out of the request body
pub fn decode_body<'a>(content_type: &str, body: &'a [u8]) -> Result<(&'a [u8], UploadKind)> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "application/json" => Ok((body, UploadKind::Json)),
        "multipart/form-data" => extract_json_file(content_type, body)
            .map(|bytes| (bytes, UploadKind::Multipart))
            .map_err(|e| ServerError::Validation(e.to_string())),
        _ => Err(ServerError::UnsupportedMediaType(content_type.to_string())),
    }
}

/// Persist one upload and hand it to the background pipeline
///
/// Returns once the document is on disk; rendering and printing have not
/// started yet.
pub async fn accept(
    state: ServerState,
    content_type: String,
    body: Bytes,
    params: UploadParams,
) -> Result<UploadResponse> {
    let (payload, upload_type) = decode_body(&content_type, &body)?;

    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| ServerError::Validation(format!("Invalid JSON data: {}", e)))?;
    let summary = ShotSummary::from_value(&value);

    let id = state.ids.next();
    let json_path = state.data_path(&id.filename);
    tokio::fs::write(&json_path, payload).await?;
    tracing::debug!(path = %json_path.display(), bytes = payload.len(), "Shot persisted");

    let response = UploadResponse {
        status: "success".to_string(),
        id: id.id,
        message: format!("Shot data received and saved as {}", id.filename),
        timestamp: id.timestamp.clone(),
        auto_printed: state.settings.print_enabled(),
        upload_type: (upload_type == UploadKind::Multipart).then_some(upload_type),
    };

    let shot = PendingShot {
        id,
        json_path,
        data_size: payload.len(),
        upload_type,
        summary,
        machine_id: params.machine_id,
        plugin_version: params.plugin_version,
    };
    state
        .tasks
        .spawn("shot_pipeline", pipeline::process(state.clone(), shot));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_body() {
        let (bytes, kind) = decode_body("application/json; charset=utf-8", b"{}").unwrap();
        assert_eq!(bytes, b"{}");
        assert_eq!(kind, UploadKind::Json);
    }

    #[test]
    fn test_decode_rejects_other_types() {
        let err = decode_body("text/plain", b"{}").unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_decode_multipart_without_boundary() {
        let err = decode_body("multipart/form-data", b"--x\r\n").unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[test]
    fn test_params_default() {
        let params: UploadParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.machine_id, "UNKNOWN");
        assert_eq!(params.plugin_version, "unknown");
    }
}
