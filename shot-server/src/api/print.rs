//! Print control routes
//!
//! Print switch, manual re-print of a rendered shot, and the OS spool queue.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shared::models::image_filename_for;
use shot_printer::QueueInfo;

use super::files::is_safe_name;
use crate::core::ServerState;
use crate::printing::PrintOutcome;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/print", post(print_control))
        .route("/api/queue", get(get_queue).delete(clear_queue))
}

/// `POST /api/print` body
///
/// `enabled` wins when present; otherwise `action` selects the operation.
#[derive(Debug, Default, Deserialize)]
pub struct PrintRequest {
    pub enabled: Option<bool>,
    pub action: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrintControlResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_enabled: Option<bool>,
    pub message: String,
}

impl PrintControlResponse {
    fn done(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            print_enabled: None,
            message: message.into(),
        }
    }
}

async fn print_control(
    State(state): State<ServerState>,
    Json(request): Json<PrintRequest>,
) -> Json<PrintControlResponse> {
    if let Some(enabled) = request.enabled {
        state.settings.set_print_enabled(enabled);
        tracing::info!(enabled, "Print switch changed");
        return Json(PrintControlResponse {
            success: true,
            print_enabled: Some(enabled),
            message: format!("Printing {}", if enabled { "enabled" } else { "disabled" }),
        });
    }

    if request.action.as_deref() != Some("print_shot") {
        return Json(PrintControlResponse::done(false, "Invalid action"));
    }

    let Some(filename) = request.filename.filter(|f| !f.is_empty()) else {
        return Json(PrintControlResponse::done(false, "No filename provided"));
    };
    if !is_safe_name(&filename) {
        return Json(PrintControlResponse::done(false, "Invalid filename"));
    }

    let image_path = state.image_path(&image_filename_for(&filename));
    if !tokio::fs::try_exists(&image_path).await.unwrap_or(false) {
        return Json(PrintControlResponse::done(false, "Image file not found"));
    }

    let outcome = state.printer.print_receipt(&image_path).await;
    tracing::info!(filename = %filename, outcome = ?outcome, "Manual re-print");
    Json(reprint_response(&outcome))
}

/// A disabled switch reports as a failed print
fn reprint_response(outcome: &PrintOutcome) -> PrintControlResponse {
    if outcome.is_printed() {
        PrintControlResponse::done(true, "Print job sent")
    } else {
        PrintControlResponse::done(false, "Print failed")
    }
}

async fn get_queue(State(state): State<ServerState>) -> Json<QueueInfo> {
    Json(state.printer.queue_info().await)
}

async fn clear_queue(State(state): State<ServerState>) -> Json<PrintControlResponse> {
    match state.printer.clear_queue().await {
        Ok(()) => Json(PrintControlResponse::done(true, "Print queue cleared")),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to clear print queue");
            Json(PrintControlResponse::done(false, "Failed to clear print queue"))
        }
    }
}
