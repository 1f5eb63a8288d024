/// Failure injection - decides whether and how each attempt fails
///
/// Expected failures travel as [`AttemptOutcome`] values through return
/// paths; `Err` is reserved for genuine internal faults, which the attempt
/// executor converts into `Failure` outcomes so they can never halt a
/// retry loop. Randomness lives in an explicitly owned, seedable RNG
/// instead of process-wide state, so tests can script it.
use crate::devices::{Device, FailureMode};
use crate::{SimError, SimResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::sync::Mutex;
use std::time::Duration;

/// Sub-operations simulated against every device on each attempt.
pub const SIMULATED_OPERATIONS: [&str; 3] = ["gather_facts", "backup_config", "check_version"];

/// Outcome of one attempt against one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// All sub-operations completed
    Success { operations: Vec<String> },

    /// Some sub-operations completed, others failed
    Partial { operations: Vec<String>, failed: usize },

    /// The attempt failed outright
    Failure(String),

    /// The attempt exceeded the per-attempt timeout
    TimedOut,
}

impl AttemptOutcome {
    /// Success-class outcomes terminate the retry loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Success { .. } | AttemptOutcome::Partial { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success { .. } => "success",
            AttemptOutcome::Partial { .. } => "partial",
            AttemptOutcome::Failure(_) => "failure",
            AttemptOutcome::TimedOut => "timed_out",
        }
    }
}

/// What the injector decided for one attempt: the outcome plus the
/// simulated latency the executor should charge for it.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectedAttempt {
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

/// Seam between the attempt executor and the failure model.
///
/// Production uses [`SimulatedFailures`]; tests substitute scripted
/// injectors to drive the retry logic deterministically.
pub trait FailureInjector: Send + Sync {
    fn inject(
        &self,
        device: &Device,
        attempt_number: u32,
        timeout: Duration,
    ) -> SimResult<InjectedAttempt>;
}

/// Random failure model driven by each device's fixed failure mode.
pub struct SimulatedFailures {
    // Shared by all worker tasks; attempts draw independently
    rng: Mutex<StdRng>,
}

impl SimulatedFailures {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Latency band for a healthy interaction, kept safely under the
    /// timeout so a healthy attempt can never trip the timeout boundary.
    fn healthy_latency(
        rng: &mut StdRng,
        base_ms: u64,
        spread_ms: u64,
        timeout: Duration,
    ) -> Duration {
        let latency = Duration::from_millis(base_ms + rng.gen_range(0..=spread_ms));
        cmp::min(latency, timeout / 2)
    }

    fn completed_operations() -> Vec<String> {
        SIMULATED_OPERATIONS.iter().map(|op| op.to_string()).collect()
    }
}

impl FailureInjector for SimulatedFailures {
    fn inject(
        &self,
        device: &Device,
        attempt_number: u32,
        timeout: Duration,
    ) -> SimResult<InjectedAttempt> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| SimError::Internal("failure injector RNG lock poisoned".to_string()))?;

        let injected = match device.failure_mode {
            FailureMode::Timeout => {
                tracing::debug!(
                    device = %device.name,
                    attempt = attempt_number,
                    "simulating timeout"
                );
                InjectedAttempt {
                    outcome: AttemptOutcome::TimedOut,
                    // Past the timeout no matter how generous it is
                    latency: timeout + Duration::from_millis(100 + rng.gen_range(0..=400)),
                }
            }

            FailureMode::Flaky { fail_probability } => {
                if rng.gen::<f64>() < fail_probability {
                    tracing::debug!(
                        device = %device.name,
                        attempt = attempt_number,
                        "simulating flaky failure"
                    );
                    InjectedAttempt {
                        outcome: AttemptOutcome::Failure(
                            "connection failed - flaky device".to_string(),
                        ),
                        latency: Duration::ZERO,
                    }
                } else {
                    InjectedAttempt {
                        outcome: AttemptOutcome::Success {
                            operations: Self::completed_operations(),
                        },
                        latency: Self::healthy_latency(&mut rng, 100, 500, timeout),
                    }
                }
            }

            FailureMode::Partial => {
                tracing::debug!(
                    device = %device.name,
                    attempt = attempt_number,
                    "simulating partial failure"
                );
                let mut operations = Vec::with_capacity(SIMULATED_OPERATIONS.len());
                let mut failed = 0;
                for operation in SIMULATED_OPERATIONS {
                    if rng.gen_bool(0.5) {
                        operations.push(format!("{}: success", operation));
                    } else {
                        operations.push(format!("{}: failed", operation));
                        failed += 1;
                    }
                }
                let latency = Self::healthy_latency(&mut rng, 200, 300, timeout);

                if failed > 0 {
                    InjectedAttempt {
                        outcome: AttemptOutcome::Partial { operations, failed },
                        latency,
                    }
                } else {
                    InjectedAttempt {
                        outcome: AttemptOutcome::Success { operations },
                        latency,
                    }
                }
            }

            FailureMode::None => InjectedAttempt {
                outcome: AttemptOutcome::Success {
                    operations: Self::completed_operations(),
                },
                latency: Self::healthy_latency(&mut rng, 100, 400, timeout),
            },
        };

        Ok(injected)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn inject(mode: FailureMode, seed: u64) -> InjectedAttempt {
        let injector = SimulatedFailures::new(Some(seed));
        let device = Device::new(0, mode);
        injector
            .inject(&device, 1, TIMEOUT)
            .expect("injection should not fault")
    }

    #[test]
    fn test_healthy_device_always_succeeds() {
        for seed in 0..20 {
            let injected = inject(FailureMode::None, seed);
            assert!(matches!(injected.outcome, AttemptOutcome::Success { .. }));
            assert!(injected.latency <= TIMEOUT / 2);
        }
    }

    #[test]
    fn test_timeout_mode_exceeds_timeout() {
        for seed in 0..20 {
            let injected = inject(FailureMode::Timeout, seed);
            assert_eq!(injected.outcome, AttemptOutcome::TimedOut);
            assert!(injected.latency > TIMEOUT);
        }
    }

    #[test]
    fn test_flaky_certain_failure() {
        for seed in 0..20 {
            let injected = inject(
                FailureMode::Flaky {
                    fail_probability: 1.0,
                },
                seed,
            );
            assert!(matches!(injected.outcome, AttemptOutcome::Failure(_)));
        }
    }

    #[test]
    fn test_flaky_certain_success() {
        for seed in 0..20 {
            let injected = inject(
                FailureMode::Flaky {
                    fail_probability: 0.0,
                },
                seed,
            );
            assert!(matches!(injected.outcome, AttemptOutcome::Success { .. }));
        }
    }

    #[test]
    fn test_partial_mode_annotates_every_operation() {
        for seed in 0..20 {
            let injected = inject(FailureMode::Partial, seed);
            match injected.outcome {
                AttemptOutcome::Partial { operations, failed } => {
                    assert_eq!(operations.len(), SIMULATED_OPERATIONS.len());
                    let annotated_failures = operations
                        .iter()
                        .filter(|op| op.ends_with(": failed"))
                        .count();
                    assert_eq!(annotated_failures, failed);
                    assert!(failed > 0);
                }
                AttemptOutcome::Success { operations } => {
                    // All three coin flips landed on success
                    assert_eq!(operations.len(), SIMULATED_OPERATIONS.len());
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_seeded_injection_is_reproducible() {
        let first = inject(FailureMode::Partial, 42);
        let second = inject(FailureMode::Partial, 42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_outcome_terminal_classification() {
        assert!(AttemptOutcome::Success {
            operations: Vec::new()
        }
        .is_terminal());
        assert!(AttemptOutcome::Partial {
            operations: Vec::new(),
            failed: 1
        }
        .is_terminal());
        assert!(!AttemptOutcome::Failure("boom".to_string()).is_terminal());
        assert!(!AttemptOutcome::TimedOut.is_terminal());
    }
}
