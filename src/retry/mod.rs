/// Retry engine - drives the attempt loop for a single device
///
/// Implements exponential backoff: delay = initial_delay * multiplier^(n-1),
/// computed off the attempt index alone. Success-class outcomes (including
/// partial results) terminate the loop; failures and timeouts retry until
/// the attempt budget is spent, and the last attempt's kind decides the
/// terminal status.
use crate::devices::Device;
use crate::executor::{run_attempt, AttemptRecord};
use crate::failures::{AttemptOutcome, FailureInjector};
use crate::SimConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal status of one device's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalStatus {
    Success,
    Failed,
    TimedOut,
    Partial,
}

impl FinalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FinalStatus::Success)
    }

    /// Success-class statuses left usable results behind.
    pub fn is_success_class(&self) -> bool {
        matches!(self, FinalStatus::Success | FinalStatus::Partial)
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalStatus::Success => write!(f, "success"),
            FinalStatus::Failed => write!(f, "failed"),
            FinalStatus::TimedOut => write!(f, "timeout"),
            FinalStatus::Partial => write!(f, "partial"),
        }
    }
}

/// Retry parameters governing one device's attempt sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,

    /// Per-attempt timeout enforced by the executor
    pub timeout: Duration,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Total attempts allowed: the first try plus `max_retries` retries.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff delay inserted after attempt `attempt_number` fails.
    ///
    /// Pure function of the attempt index, independent of how long the
    /// attempt itself took.
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        let exponent = attempt_number.saturating_sub(1);
        self.initial_delay
            .mul_f64(self.backoff_multiplier.powi(exponent as i32))
    }
}

impl From<&SimConfig> for RetryPolicy {
    fn from(config: &SimConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: config.timeout,
            initial_delay: config.initial_delay,
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

/// Terminal record for one device: the attempt history and final status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResult {
    pub device: Arc<Device>,

    pub final_status: FinalStatus,

    /// Chronological attempt history; never empty
    pub attempts: Vec<AttemptRecord>,

    /// Wall time spent on this device, attempts and backoff included
    pub total_duration: Duration,

    /// Always `attempts.len() - 1`, bounded by the policy's max_retries
    pub retries_used: u32,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl DeviceResult {
    pub fn is_success(&self) -> bool {
        self.final_status.is_success()
    }

    /// Error detail from the last attempt, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.attempts.last().and_then(|a| a.error_detail.as_deref())
    }

    /// Synthetic result for a device whose worker died outside the retry
    /// engine's own containment (a panic). Keeps the one-result-per-device
    /// and non-empty-history invariants intact.
    pub fn internal_failure(device: Arc<Device>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let now = Utc::now();
        Self {
            device,
            final_status: FinalStatus::Failed,
            attempts: vec![AttemptRecord {
                attempt_number: 1,
                outcome: AttemptOutcome::Failure(detail.clone()),
                duration: Duration::ZERO,
                error_detail: Some(detail),
            }],
            total_duration: Duration::ZERO,
            retries_used: 0,
            started_at: now,
            completed_at: now,
        }
    }
}

/// Process one device to a terminal [`DeviceResult`].
///
/// Runs up to `max_retries + 1` attempts with exponential backoff between
/// them; the backoff sleep suspends only this device's task. The function
/// never fails: expected failures are outcomes, and internal injector
/// faults are absorbed by the attempt executor.
pub async fn process_device(
    injector: &dyn FailureInjector,
    device: Arc<Device>,
    policy: &RetryPolicy,
) -> DeviceResult {
    let started_at = Utc::now();
    let started = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut attempts: Vec<AttemptRecord> = Vec::new();

    let final_status = loop {
        let attempt_number = attempts.len() as u32 + 1;
        tracing::debug!(
            device = %device.name,
            attempt = attempt_number,
            max_attempts,
            "starting attempt"
        );

        let record = run_attempt(injector, &device, attempt_number, policy.timeout).await;

        let decision = match &record.outcome {
            AttemptOutcome::Success { .. } => Some(FinalStatus::Success),
            AttemptOutcome::Partial { .. } => Some(FinalStatus::Partial),
            AttemptOutcome::TimedOut if attempt_number >= max_attempts => {
                Some(FinalStatus::TimedOut)
            }
            AttemptOutcome::Failure(_) if attempt_number >= max_attempts => {
                Some(FinalStatus::Failed)
            }
            _ => None,
        };
        let outcome_label = record.outcome.label();
        attempts.push(record);

        if let Some(status) = decision {
            break status;
        }

        let delay = policy.delay_for(attempt_number);
        tracing::debug!(
            device = %device.name,
            attempt = attempt_number,
            outcome = outcome_label,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, backing off before retry"
        );
        tokio::time::sleep(delay).await;
    };

    let total_duration = started.elapsed();
    let retries_used = attempts.len() as u32 - 1;

    if final_status.is_success_class() {
        tracing::info!(
            device = %device.name,
            status = %final_status,
            attempts = attempts.len(),
            "device processed"
        );
    } else {
        tracing::warn!(
            device = %device.name,
            status = %final_status,
            attempts = attempts.len(),
            "device failed after exhausting attempts"
        );
    }

    DeviceResult {
        device,
        final_status,
        attempts,
        total_duration,
        retries_used,
        started_at,
        completed_at: Utc::now(),
    }
}
