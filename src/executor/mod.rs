/// Attempt execution - runs one attempt against one device
///
/// The executor owns the per-attempt timeout boundary and is the first
/// isolation ring: injected failures pass through as outcomes, and a
/// fault raised out of the injector is converted into a `Failure` outcome
/// here instead of crashing the worker.
use crate::devices::Device;
use crate::failures::{AttemptOutcome, FailureInjector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one attempt, appended to the owning device's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt index
    pub attempt_number: u32,

    pub outcome: AttemptOutcome,

    /// Simulated attempt latency, capped at the per-attempt timeout
    pub duration: Duration,

    pub error_detail: Option<String>,
}

/// Run one attempt against `device`, enforcing the timeout boundary.
///
/// The injector's simulated latency is consumed here via an async sleep
/// (suspending only the calling task). If the latency would exceed
/// `timeout` the outcome is forced to `TimedOut` regardless of what the
/// injector intended, and the recorded duration equals the timeout
/// exactly.
pub async fn run_attempt(
    injector: &dyn FailureInjector,
    device: &Device,
    attempt_number: u32,
    timeout: Duration,
) -> AttemptRecord {
    let injected = match injector.inject(device, attempt_number, timeout) {
        Ok(injected) => injected,
        Err(error) => {
            // A bug in the failure model must surface in the record,
            // not take down the worker.
            tracing::error!(
                device = %device.name,
                attempt = attempt_number,
                error = %error,
                "failure injector raised an internal fault"
            );
            return AttemptRecord {
                attempt_number,
                outcome: AttemptOutcome::Failure(format!("internal fault: {}", error)),
                duration: Duration::ZERO,
                error_detail: Some(error.to_string()),
            };
        }
    };

    if injected.latency > timeout {
        tokio::time::sleep(timeout).await;
        return AttemptRecord {
            attempt_number,
            outcome: AttemptOutcome::TimedOut,
            duration: timeout,
            error_detail: Some(format!(
                "operation timed out after {}",
                humantime::format_duration(timeout)
            )),
        };
    }

    tokio::time::sleep(injected.latency).await;

    let error_detail = match &injected.outcome {
        AttemptOutcome::Failure(reason) => Some(reason.clone()),
        AttemptOutcome::Partial { operations, failed } => Some(format!(
            "{} of {} operations failed",
            failed,
            operations.len()
        )),
        AttemptOutcome::TimedOut => Some(format!(
            "operation timed out after {}",
            humantime::format_duration(timeout)
        )),
        AttemptOutcome::Success { .. } => None,
    };

    AttemptRecord {
        attempt_number,
        outcome: injected.outcome,
        duration: injected.latency,
        error_detail,
    }
}
