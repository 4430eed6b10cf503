//! OS print spool queue
//!
//! Read-only inspection and bulk clearing of the local print queue.
//! - Unix: `lpstat -o` / `cancel -a -x`
//! - Windows: PowerShell `Get-PrintJob` / `Remove-PrintJob`

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};

#[cfg(windows)]
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(not(windows))]
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
const CLEAR_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending job in the spool queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub job_id: String,
    pub owner: Option<String>,
    pub size: Option<u64>,
    pub status: String,
    pub added_time: String,
}

/// Snapshot of the spool queue
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueInfo {
    pub queue_count: usize,
    pub queue_items: Vec<QueueItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueInfo {
    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Parse `lpstat -o` output
///
/// Lines look like `Receipt80-42  alice  1024  Mon 01 Jan 2024 08:00:00 AM CET`;
/// lines with fewer than five fields are skipped.
pub fn parse_lpstat(output: &str) -> Vec<QueueItem> {
    let now = chrono::Local::now().format("%H:%M:%S").to_string();

    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 5 {
                return None;
            }
            Some(QueueItem {
                job_id: parts[0].to_string(),
                owner: Some(parts[1].to_string()),
                size: parts[2].parse().ok(),
                status: "Pending".to_string(),
                added_time: now.clone(),
            })
        })
        .collect()
}

async fn run(program: &str, args: &[&str], timeout: Duration) -> PrintResult<String> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| PrintError::Strategy {
            strategy: program.to_string(),
            reason: format!("timed out after {}s", timeout.as_secs()),
        })??;

    if !output.status.success() {
        return Err(PrintError::Command {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Current spool queue; errors are reported inside the snapshot
#[instrument]
pub async fn queue_info(printer: Option<&str>) -> QueueInfo {
    #[cfg(not(windows))]
    {
        let mut args = vec!["-o"];
        if let Some(p) = printer {
            args.push(p);
        }
        match run("lpstat", &args, QUERY_TIMEOUT).await {
            Ok(stdout) => {
                let items = parse_lpstat(&stdout);
                QueueInfo {
                    queue_count: items.len(),
                    queue_items: items,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read print queue");
                QueueInfo::failed(e)
            }
        }
    }

    #[cfg(windows)]
    {
        let script = match printer {
            Some(p) => format!(
                "Get-PrintJob -PrinterName '{}' | Select-Object -ExpandProperty Id",
                p.replace('\'', "''")
            ),
            None => "Get-Printer | ForEach-Object { Get-PrintJob -PrinterName $_.Name } | Select-Object -ExpandProperty Id".to_string(),
        };
        match run("powershell", &["-NoProfile", "-Command", &script], QUERY_TIMEOUT).await {
            Ok(stdout) => {
                let now = chrono::Local::now().format("%H:%M:%S").to_string();
                let items: Vec<QueueItem> = stdout
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|id| QueueItem {
                        job_id: id.to_string(),
                        owner: None,
                        size: None,
                        status: "Pending".to_string(),
                        added_time: now.clone(),
                    })
                    .collect();
                QueueInfo {
                    queue_count: items.len(),
                    queue_items: items,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read print queue");
                QueueInfo::failed(e)
            }
        }
    }
}

/// Cancel every pending job
#[instrument]
pub async fn clear_queue(printer: Option<&str>) -> PrintResult<()> {
    #[cfg(not(windows))]
    {
        let mut args = vec!["-a", "-x"];
        if let Some(p) = printer {
            args.push(p);
        }
        run("cancel", &args, CLEAR_TIMEOUT).await?;
    }

    #[cfg(windows)]
    {
        let script = match printer {
            Some(p) => format!(
                "Get-PrintJob -PrinterName '{}' | Remove-PrintJob",
                p.replace('\'', "''")
            ),
            None => "Get-Printer | ForEach-Object { Get-PrintJob -PrinterName $_.Name } | Remove-PrintJob".to_string(),
        };
        run("powershell", &["-NoProfile", "-Command", &script], CLEAR_TIMEOUT).await?;
    }

    info!("Print queue cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lpstat() {
        let out = "Receipt80-42            alice          1024   Mon 01 Jan 2024 08:00:00 AM CET\n\
                   \n\
                   Receipt80-43            bob            2048   Mon 01 Jan 2024 08:01:00 AM CET\n\
                   garbage line\n";
        let items = parse_lpstat(out);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].job_id, "Receipt80-42");
        assert_eq!(items[0].owner.as_deref(), Some("alice"));
        assert_eq!(items[1].size, Some(2048));
        assert!(items.iter().all(|i| i.status == "Pending"));
    }

    #[test]
    fn test_parse_empty_queue() {
        assert!(parse_lpstat("").is_empty());
    }

    #[test]
    fn test_failed_snapshot_serializes_error() {
        let info = QueueInfo::failed("lpstat: not found");
        assert_eq!(info.queue_count, 0);
        assert_eq!(info.error.as_deref(), Some("lpstat: not found"));
    }
}
