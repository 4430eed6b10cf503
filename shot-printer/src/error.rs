//! Error types for the printer library

use std::path::PathBuf;
use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// IO error while preparing or sending an image
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image could not be decoded or encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Source image does not exist
    #[error("Image not found: {0}")]
    NotFound(PathBuf),

    /// Spooler command exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    /// Strategy failed without a process exit status
    #[error("Strategy {strategy} failed: {reason}")]
    Strategy { strategy: String, reason: String },

    /// Every strategy in the chain failed
    #[error("All {attempts} print strategies failed")]
    Exhausted { attempts: usize },

    /// Windows-specific printing error
    #[cfg(windows)]
    #[error("Windows printer error: {0}")]
    WindowsPrinter(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
