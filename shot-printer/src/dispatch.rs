//! Print dispatcher
//!
//! Walks an ordered strategy chain until one strategy succeeds.

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::strategy::{PrintStrategy, platform_chain};

/// One print attempt: the device image plus the receipt it came from
///
/// When the device image was derived from the receipt (a `_print.bmp`),
/// it is removed after a successful dispatch. A receipt dispatched as-is is
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub device_image: PathBuf,
    pub source: PathBuf,
}

impl PrintJob {
    pub fn new(device_image: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            device_image: device_image.into(),
            source: source.into(),
        }
    }

    /// Dispatch the receipt itself, without an intermediate bitmap
    pub fn direct(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self {
            device_image: source.clone(),
            source,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.device_image != self.source
    }
}

/// Ordered print strategy chain
pub struct PrintDispatcher {
    strategies: Vec<Box<dyn PrintStrategy>>,
}

impl PrintDispatcher {
    pub fn new(strategies: Vec<Box<dyn PrintStrategy>>) -> Self {
        Self { strategies }
    }

    /// Chain for the current platform (see [`platform_chain`])
    pub fn for_platform(printer: Option<&str>) -> Self {
        Self::new(platform_chain(printer))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order
    ///
    /// Returns the name of the strategy that printed the job.
    #[instrument(skip(self, job), fields(image = %job.device_image.display()))]
    pub async fn dispatch(&self, job: &PrintJob) -> PrintResult<String> {
        if !job.device_image.exists() {
            return Err(PrintError::NotFound(job.device_image.clone()));
        }

        for strategy in &self.strategies {
            match strategy.attempt(&job.device_image).await {
                Ok(()) => {
                    info!(strategy = strategy.name(), "Print job dispatched");
                    if job.is_derived() {
                        remove_intermediate(&job.device_image);
                    }
                    return Ok(strategy.name().to_string());
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Printer failed, trying next");
                }
            }
        }

        error!(attempts = self.strategies.len(), "All print strategies failed");
        Err(PrintError::Exhausted {
            attempts: self.strategies.len(),
        })
    }
}

fn remove_intermediate(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "Removed device bitmap"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove device bitmap"),
    }
}
