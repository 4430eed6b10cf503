//! Service status

use std::path::Path;

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/status", get(status))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub start_time: String,
    pub shot_count: usize,
    /// Includes the request asking
    pub active_users: usize,
    pub max_users: usize,
    pub print_enabled: bool,
    pub print_queue_count: usize,
    pub data_dir: String,
    pub image_dir: String,
}

fn absolute(dir: &Path) -> String {
    std::path::absolute(dir)
        .unwrap_or_else(|_| dir.to_path_buf())
        .display()
        .to_string()
}

async fn status(State(state): State<ServerState>) -> Json<StatusResponse> {
    let queue = state.printer.queue_info().await;

    Json(StatusResponse {
        status: "running".into(),
        start_time: state.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        shot_count: state.ledger.len(),
        active_users: state.admission.active(),
        max_users: state.admission.max(),
        print_enabled: state.settings.print_enabled(),
        print_queue_count: queue.queue_count,
        data_dir: absolute(&state.config.data_dir),
        image_dir: absolute(&state.config.image_dir),
    })
}
