//! Data models
//!
//! Shared between the ingestion service, the renderer and the HTTP API.

pub mod record;
pub mod shot;

// Re-exports
pub use record::*;
pub use shot::*;
