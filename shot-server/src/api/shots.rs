//! Ledger listing

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;

/// Number of records returned by `GET /api/shots`
pub const LISTED_SHOTS: usize = 20;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/shots", get(list_shots))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotListItem {
    pub id: i64,
    pub filename: String,
    pub timestamp: String,
    pub profile: String,
    pub clock: String,
    pub data_size: usize,
    pub image_exists: bool,
    pub machine_id: String,
    pub plugin_version: String,
}

/// Most recent records first
async fn list_shots(State(state): State<ServerState>) -> Json<Vec<ShotListItem>> {
    let mut items = Vec::with_capacity(LISTED_SHOTS);
    for record in state.ledger.recent(LISTED_SHOTS) {
        let image_path = state.image_path(&record.image_filename());
        let image_exists = tokio::fs::try_exists(&image_path).await.unwrap_or(false);
        items.push(ShotListItem {
            id: record.id,
            profile: record.profile.unwrap_or_else(|| "unknown".into()),
            clock: record.clock.unwrap_or_else(|| "unknown".into()),
            filename: record.filename,
            timestamp: record.timestamp,
            data_size: record.data_size,
            image_exists,
            machine_id: record.machine_id,
            plugin_version: record.plugin_version,
        });
    }
    Json(items)
}
