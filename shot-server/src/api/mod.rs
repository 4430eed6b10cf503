//! HTTP API
//!
//! Every route passes through the admission middleware: one permit per
//! request, held until the response is produced.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::core::admission;

pub mod files;
pub mod health;
pub mod print;
pub mod settings;
pub mod shots;
pub mod status;
pub mod upload;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Shot ingestion
        .merge(upload::router())
        // Print switch, re-print, spool queue
        .merge(print::router())
        // Runtime switches and language
        .merge(settings::router())
        // Ledger listing
        .merge(shots::router())
        .merge(status::router())
        // Rendered receipts and persisted documents
        .merge(files::router())
        .merge(health::router())
}

/// Build a fully configured application with all middleware
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    build_router()
        // Admission - innermost, wraps the handler only
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admission::admit,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
}
