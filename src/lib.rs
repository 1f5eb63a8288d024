pub mod devices;
pub mod dispatcher;
pub mod executor;
pub mod failures;
pub mod report;
pub mod retry;

// Re-export the simulation entry points for convenience
pub use dispatcher::{run_all, run_simulation};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the simulator's own machinery.
///
/// Injected failures (timeouts, flaky connections, partial results) are
/// never errors - they travel as [`failures::AttemptOutcome`] values
/// through return paths. This enum covers genuine faults: rejected
/// configuration and internal bugs.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal fault: {0}")]
    Internal(String),
}

pub type SimResult<T> = Result<T, SimError>;

/// Configuration consumed by the simulation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of devices to generate
    pub device_count: usize,

    /// Fraction of the fleet assigned a failure profile (0.0-1.0)
    pub failure_rate: f64,

    /// Maximum retry attempts per device (0 means a single attempt)
    pub max_retries: u32,

    /// Per-attempt timeout
    pub timeout: Duration,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Maximum devices processed concurrently
    pub max_workers: usize,

    /// RNG seed for reproducible device generation
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device_count: 10,
            failure_rate: 0.3,
            max_retries: 3,
            timeout: Duration::from_secs(5),
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_workers: num_cpus::get().max(1),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Validate configuration bounds before a run.
    pub fn validate(&self) -> SimResult<()> {
        if self.device_count == 0 {
            return Err(SimError::InvalidConfig(
                "device_count must be greater than zero".to_string(),
            ));
        }
        if !self.failure_rate.is_finite() || !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(SimError::InvalidConfig(format!(
                "failure_rate must be within 0.0-1.0, got {}",
                self.failure_rate
            )));
        }
        if self.timeout.is_zero() {
            return Err(SimError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_workers == 0 {
            return Err(SimError::InvalidConfig(
                "max_workers must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
