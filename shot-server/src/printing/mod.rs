//! Receipt printing
//!
//! Bridges rendered receipts to the device side: the print gate, device
//! bitmap preparation on the blocking pool, and the strategy chain.

use std::path::Path;
use std::sync::Arc;

use shot_printer::{
    PrintDispatcher, PrintImageSpec, PrintJob, PrintResult, QueueInfo, clear_queue,
    prepare_device_bitmap, queue_info,
};
use tracing::{debug, info, instrument, warn};

use crate::core::settings::RuntimeSettings;

/// Result of one print request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    /// Printing is switched off; nothing was attempted
    Disabled,
    Printed { strategy: String },
    Failed(String),
}

impl PrintOutcome {
    pub fn is_printed(&self) -> bool {
        matches!(self, PrintOutcome::Printed { .. })
    }
}

pub struct ReceiptPrinter {
    dispatcher: PrintDispatcher,
    spec: PrintImageSpec,
    printer_name: Option<String>,
    settings: Arc<RuntimeSettings>,
}

impl ReceiptPrinter {
    pub fn new(
        dispatcher: PrintDispatcher,
        spec: PrintImageSpec,
        printer_name: Option<String>,
        settings: Arc<RuntimeSettings>,
    ) -> Self {
        Self {
            dispatcher,
            spec,
            printer_name,
            settings,
        }
    }

    /// Print a rendered receipt, subject to the print switch
    ///
    /// Used for both the automatic print after rendering and manual
    /// re-prints. The switch is read once, before the device bitmap is built.
    pub async fn print_receipt(&self, receipt: &Path) -> PrintOutcome {
        if !self.settings.print_enabled() {
            debug!(receipt = %receipt.display(), "Printing disabled, skipping");
            return PrintOutcome::Disabled;
        }
        self.dispatch_receipt(receipt).await
    }

    #[instrument(skip(self), fields(receipt = %receipt.display()))]
    async fn dispatch_receipt(&self, receipt: &Path) -> PrintOutcome {
        let source = receipt.to_path_buf();
        let spec = self.spec;

        let prepared = tokio::task::spawn_blocking({
            let source = source.clone();
            move || prepare_device_bitmap(&source, &spec)
        })
        .await;

        let job = match prepared {
            Ok(Ok(bitmap)) => PrintJob::new(bitmap, &source),
            Ok(Err(e)) => {
                warn!(error = %e, "Device bitmap failed, printing receipt as-is");
                PrintJob::direct(&source)
            }
            Err(e) => {
                warn!(error = %e, "Device bitmap task aborted, printing receipt as-is");
                PrintJob::direct(&source)
            }
        };

        match self.dispatcher.dispatch(&job).await {
            Ok(strategy) => {
                info!(strategy = %strategy, "Receipt printed");
                PrintOutcome::Printed { strategy }
            }
            Err(e) => PrintOutcome::Failed(e.to_string()),
        }
    }

    pub async fn queue_info(&self) -> QueueInfo {
        queue_info(self.printer_name.as_deref()).await
    }

    pub async fn clear_queue(&self) -> PrintResult<()> {
        clear_queue(self.printer_name.as_deref()).await
    }
}
