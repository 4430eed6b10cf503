//! # shot-printer
//!
//! Device side of the shot receipt pipeline.
//!
//! ## Scope
//!
//! This crate handles HOW a rendered receipt reaches paper:
//! - Device bitmap preparation (resize, rotate, 1-bit threshold)
//! - Ordered print strategy chain per platform (lpr/lp, GDI, shell verb, mspaint)
//! - OS spool queue inspection and clearing
//!
//! Rendering the receipt itself (WHAT to print) stays in `shot-server`.
//!
//! ## Example
//!
//! ```ignore
//! use shot_printer::{PrintDispatcher, PrintImageSpec, PrintJob, prepare_device_bitmap};
//!
//! let spec = PrintImageSpec::default();
//! let bitmap = prepare_device_bitmap(Path::new("shots_images/shot_1.png"), &spec)?;
//!
//! let dispatcher = PrintDispatcher::for_platform(None);
//! dispatcher.dispatch(&PrintJob::new(bitmap, "shots_images/shot_1.png")).await?;
//! ```

mod dispatch;
mod error;
mod raster;
mod spool;
mod strategy;

// Re-exports
pub use dispatch::{PrintDispatcher, PrintJob};
pub use error::{PrintError, PrintResult};
pub use raster::{Bitmap, PrintImageSpec, device_bitmap_path, prepare_device_bitmap, threshold};
pub use spool::{QueueInfo, QueueItem, clear_queue, parse_lpstat, queue_info};
pub use strategy::{CommandStrategy, PrintStrategy, platform_chain};

#[cfg(windows)]
pub use strategy::GdiStrategy;
