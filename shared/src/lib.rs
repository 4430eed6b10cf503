//! Shared types for PrintTheShot
//!
//! The shot data model used by the ingestion service and the receipt
//! renderer: the uploaded document, its numeric traces and metadata, and the
//! ledger record kept for every processed shot.

pub mod error;
pub mod models;

// Re-exports
pub use error::{ShotError, ShotResult};
pub use models::{
    MetaValue, ShotDocument, ShotMetadata, ShotRecord, ShotSummary, ShotTimestamp, ShotTrace,
    UploadKind,
};
pub use serde::{Deserialize, Serialize};
