//! Error types for shot data

use thiserror::Error;

/// Errors raised while turning an uploaded document into renderable data
#[derive(Debug, Error)]
pub enum ShotError {
    /// Document is not valid JSON or does not match the shot schema
    #[error("Invalid shot document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A sample could not be read as a number
    #[error("Non-numeric sample in {series} at index {index}")]
    NonNumeric { series: &'static str, index: usize },

    /// Traces are present but hold no samples after truncation
    #[error("Shot trace is empty")]
    EmptyTrace,
}

/// Result type for shot data operations
pub type ShotResult<T> = Result<T, ShotError>;
