/// Outcome aggregation and report rendering
///
/// The summary is a pure fold over the finalized result set - nothing here
/// mutates a result, and folding the same slice twice yields an identical
/// summary.
use crate::retry::{DeviceResult, FinalStatus};
use crate::{SimError, SimResult};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary statistics folded over a completed result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total_devices: usize,
    pub successful: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub partial: usize,

    /// successful / total, 0.0 for an empty run
    pub success_rate: f64,

    /// Mean retries_used across successful devices, 0.0 when none succeeded
    pub avg_retries_successful: f64,

    /// Wall-clock span of the whole run, not the sum of per-device
    /// durations (they overlap)
    pub total_duration: Duration,
}

impl SimulationSummary {
    pub fn from_results(results: &[DeviceResult], total_duration: Duration) -> Self {
        let total_devices = results.len();
        let count = |status: FinalStatus| {
            results
                .iter()
                .filter(|r| r.final_status == status)
                .count()
        };

        let successful = count(FinalStatus::Success);
        let failed = count(FinalStatus::Failed);
        let timed_out = count(FinalStatus::TimedOut);
        let partial = count(FinalStatus::Partial);

        let success_rate = if total_devices > 0 {
            successful as f64 / total_devices as f64
        } else {
            0.0
        };

        let avg_retries_successful = if successful > 0 {
            let retries: u32 = results
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.retries_used)
                .sum();
            f64::from(retries) / successful as f64
        } else {
            0.0
        };

        Self {
            total_devices,
            successful,
            failed,
            timed_out,
            partial,
            success_rate,
            avg_retries_successful,
            total_duration,
        }
    }
}

/// Render the human-readable run report.
pub fn render_report(results: &[DeviceResult], summary: &SimulationSummary) -> String {
    let mut lines: Vec<String> = vec![
        "=== Automation Failure Simulator Results ==="
            .bold()
            .to_string(),
        String::new(),
        format!("Total Devices: {}", summary.total_devices),
        format!(
            "Successful: {} ({:.1}%)",
            summary.successful,
            summary.success_rate * 100.0
        ),
        format!("Failed: {}", summary.failed),
        format!("Timed Out: {}", summary.timed_out),
        format!("Partial: {}", summary.partial),
        format!("Total Time: {}", format_secs(summary.total_duration)),
        String::new(),
    ];

    if summary.successful > 0 {
        lines.push(format!(
            "Average Retries (successful): {:.1}",
            summary.avg_retries_successful
        ));
        lines.push(String::new());
    }

    lines.push("Device Details:".to_string());

    // Stable order for humans; the dispatcher hands results over in
    // completion order
    let mut ordered: Vec<&DeviceResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.device.id);

    for result in ordered {
        lines.push(format!("  {}", detail_line(result)));
    }

    lines.join("\n")
}

/// Machine-readable rendering of the summary plus per-device results.
pub fn render_json(results: &[DeviceResult], summary: &SimulationSummary) -> SimResult<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "summary": summary,
        "results": results,
    }))
    .map_err(|e| SimError::Internal(format!("report serialization failed: {}", e)))
}

fn detail_line(result: &DeviceResult) -> String {
    let marker = if result.final_status.is_success_class() {
        "✓".green()
    } else {
        "✗".red()
    };
    let device = format!("{} ({})", result.device.name, result.device.address);
    let elapsed = format_secs(result.total_duration);

    let status = match result.final_status {
        FinalStatus::Success if result.retries_used == 0 => {
            format!("Success on first try ({})", elapsed)
        }
        FinalStatus::Success => format!(
            "Success after {} retries ({})",
            result.retries_used, elapsed
        ),
        FinalStatus::TimedOut => format!(
            "Failed: Timeout after {} attempts ({})",
            result.attempts.len(),
            elapsed
        ),
        FinalStatus::Partial => format!(
            "Partial failure: {} ({})",
            result.last_error().unwrap_or("unknown"),
            elapsed
        ),
        FinalStatus::Failed => format!(
            "Failed: {} after {} attempts ({})",
            result.last_error().unwrap_or("Unknown error"),
            result.attempts.len(),
            elapsed
        ),
    };

    format!("{} {} - {}", marker, device, status)
}

fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
