//! Post-response shot pipeline
//!
//! Runs once per accepted upload, detached from the request: render the
//! receipt, append the ledger record, then print when the switch allows.
//! Failures end up in the log and in `image_generated`, never in a response.

use std::path::PathBuf;

use shared::models::image_filename_for;
use shared::{ShotRecord, ShotSummary, UploadKind};
use tracing::{info, warn};

use crate::core::ServerState;
use crate::ingest::ShotId;
use crate::printing::PrintOutcome;
use crate::render::RenderContext;
use crate::render::receipt::UNKNOWN_MACHINE;

/// An accepted upload whose document is already on disk
#[derive(Debug, Clone)]
pub struct PendingShot {
    pub id: ShotId,
    pub json_path: PathBuf,
    pub data_size: usize,
    pub upload_type: UploadKind,
    pub summary: ShotSummary,
    pub machine_id: String,
    pub plugin_version: String,
}

impl PendingShot {
    fn record(&self, image_generated: bool) -> ShotRecord {
        ShotRecord {
            id: self.id.id,
            filename: self.id.filename.clone(),
            timestamp: self.id.timestamp.clone(),
            data_size: self.data_size,
            clock: self.summary.clock.clone(),
            profile: self.summary.profile.clone(),
            upload_type: self.upload_type,
            machine_id: self.machine_id.clone(),
            plugin_version: self.plugin_version.clone(),
            image_generated,
        }
    }
}

/// Render context from the switches as they are right now
pub fn render_context(state: &ServerState, machine_id: &str) -> RenderContext {
    RenderContext {
        machine_id: (machine_id != UNKNOWN_MACHINE).then(|| machine_id.to_string()),
        bean_info: state.settings.bean_info_enabled(),
        language: state.settings.language(),
    }
}

/// Render, record, print
pub async fn process(state: ServerState, shot: PendingShot) {
    let image_path = state.image_path(&image_filename_for(&shot.id.filename));
    let ctx = render_context(&state, &shot.machine_id);

    let image_generated = {
        let renderer = state.renderer.clone();
        let json = shot.json_path.clone();
        let png = image_path.clone();
        match tokio::task::spawn_blocking(move || renderer.render_to_file(&json, &png, &ctx)).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(id = shot.id.id, error = %e, "Render task aborted");
                false
            }
        }
    };

    state.ledger.push(shot.record(image_generated));
    info!(
        id = shot.id.id,
        filename = %shot.id.filename,
        data_size = shot.data_size,
        upload_type = shot.upload_type.as_str(),
        machine_id = %shot.machine_id,
        plugin_version = %shot.plugin_version,
        image_generated,
        "Shot processed"
    );

    if !image_generated {
        return;
    }

    match state.printer.print_receipt(&image_path).await {
        PrintOutcome::Disabled => {}
        PrintOutcome::Printed { strategy } => {
            info!(id = shot.id.id, strategy = %strategy, "Shot printed");
        }
        PrintOutcome::Failed(reason) => {
            warn!(id = shot.id.id, reason = %reason, "Shot print failed");
        }
    }
}
