//! Receipt rendering
//!
//! Turns a persisted shot document into a landscape grayscale receipt:
//! trace chart on the left, metadata columns on the right.
//!
//! - [`layout`] - measured word wrap for the metadata columns
//! - [`font`] - glyph source (TrueType or built-in boxes)
//! - [`canvas`] - anti-aliased drawing primitives
//! - [`chart`] - fixed-range trace chart
//! - [`receipt`] - page composition and the file-level entry point

pub mod canvas;
pub mod chart;
pub mod font;
pub mod labels;
pub mod layout;
pub mod receipt;

pub use font::GlyphFont;
pub use labels::ReceiptLabels;
pub use layout::{TextMeasure, WrapOptions, wrap_text};
pub use receipt::{ReceiptRenderer, RenderContext};

use shared::ShotError;
use thiserror::Error;

/// Rendering failures; never leave the renderer boundary
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shot(#[from] ShotError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Renderer panicked: {0}")]
    Panic(String),
}

pub type RenderResult<T> = Result<T, RenderError>;
