//! File routes
//!
//! Rendered receipts and persisted shot documents, by bare file name.

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use http::{StatusCode, header};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/images/{filename}", get(serve_image))
        .route("/download/json/{filename}", get(download_json))
}

/// Bare file name: no separators, no parent references
pub fn is_safe_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}

/// File response
enum FileResponse {
    Png(Bytes),
    Json { name: String, content: Bytes },
    NotFound,
    BadRequest(&'static str),
}

impl IntoResponse for FileResponse {
    fn into_response(self) -> Response {
        match self {
            FileResponse::Png(content) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], content).into_response()
            }
            FileResponse::Json { name, content } => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", name),
                    ),
                ],
                content,
            )
                .into_response(),
            FileResponse::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
            FileResponse::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}

async fn serve_image(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> FileResponse {
    if !is_safe_name(&filename) || !filename.ends_with(".png") {
        return FileResponse::BadRequest("Invalid filename");
    }

    match tokio::fs::read(state.image_path(&filename)).await {
        Ok(content) => FileResponse::Png(content.into()),
        Err(e) => {
            tracing::debug!(filename = %filename, error = %e, "Image not found");
            FileResponse::NotFound
        }
    }
}

async fn download_json(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> FileResponse {
    if !is_safe_name(&filename) || !filename.ends_with(".json") {
        return FileResponse::BadRequest("Invalid filename");
    }

    match tokio::fs::read(state.data_path(&filename)).await {
        Ok(content) => FileResponse::Json {
            name: filename,
            content: content.into(),
        },
        Err(e) => {
            tracing::debug!(filename = %filename, error = %e, "Shot file not found");
            FileResponse::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_names() {
        assert!(is_safe_name("shot_20240101_083015_1704097815.png"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("../secret.json"));
        assert!(!is_safe_name("a/b.png"));
        assert!(!is_safe_name("a\\b.png"));
    }
}
