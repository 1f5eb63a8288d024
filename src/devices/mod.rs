// Device registry - synthetic fleet generation with failure profiles
//
// Devices are generated once at startup and never mutated; the dispatcher
// shares them read-only across all worker tasks.

use crate::SimConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Failure profile fixed at registry construction for the device's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FailureMode {
    /// Healthy device - every attempt succeeds
    None,

    /// Every attempt's simulated latency exceeds the configured timeout
    Timeout,

    /// Each attempt fails independently with the given probability
    Flaky { fail_probability: f64 },

    /// Some sub-operations succeed and others fail within one attempt
    Partial,
}

impl FailureMode {
    pub fn is_healthy(&self) -> bool {
        matches!(self, FailureMode::None)
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::None => write!(f, "none"),
            FailureMode::Timeout => write!(f, "timeout"),
            FailureMode::Flaky { .. } => write!(f, "flaky"),
            FailureMode::Partial => write!(f, "partial"),
        }
    }
}

/// A synthetic automation target with a fixed failure profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Position in the registry sequence
    pub id: usize,

    /// Hostname (`router1`, `router2`, ...)
    pub name: String,

    /// Synthetic management address
    pub address: String,

    /// Failure profile assigned at registry construction
    pub failure_mode: FailureMode,
}

impl Device {
    /// Create a device at the given registry position.
    pub fn new(id: usize, failure_mode: FailureMode) -> Self {
        Self {
            id,
            name: format!("router{}", id + 1),
            address: format!("192.168.1.{}", id + 1),
            failure_mode,
        }
    }
}

/// Immutable set of devices for one simulation run.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Arc<Device>>,
}

impl DeviceRegistry {
    /// Generate a fleet with failure profiles assigned to the first
    /// `device_count * failure_rate` devices and healthy profiles for the
    /// remainder.
    ///
    /// Flaky devices draw their per-attempt failure probability from
    /// 0.6..0.9 so retries have something to chew on without succeeding
    /// trivially. Passing the same seed yields an identical fleet.
    pub fn generate(config: &SimConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let failure_count = (config.device_count as f64 * config.failure_rate) as usize;

        let mut devices = Vec::with_capacity(config.device_count);
        for id in 0..config.device_count {
            let mode = if id < failure_count {
                Self::random_failure_mode(&mut rng)
            } else {
                FailureMode::None
            };
            devices.push(Arc::new(Device::new(id, mode)));
        }

        tracing::debug!(
            devices = devices.len(),
            failing = failure_count,
            "generated device registry"
        );

        Self { devices }
    }

    /// Build a registry from pre-constructed devices (forced fleets).
    pub fn from_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: devices.into_iter().map(Arc::new).collect(),
        }
    }

    fn random_failure_mode(rng: &mut StdRng) -> FailureMode {
        match rng.gen_range(0..3) {
            0 => FailureMode::Timeout,
            1 => FailureMode::Flaky {
                fail_probability: rng.gen_range(0.6..0.9),
            },
            _ => FailureMode::Partial,
        }
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_devices(self) -> Vec<Arc<Device>> {
        self.devices
    }
}
