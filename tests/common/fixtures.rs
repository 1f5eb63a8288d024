use fleetsim::devices::{Device, FailureMode};
use fleetsim::SimConfig;
use std::sync::Arc;
use std::time::Duration;

/// Fleet of `count` devices all carrying the same failure mode.
pub fn uniform_fleet(count: usize, mode: FailureMode) -> Vec<Arc<Device>> {
    (0..count)
        .map(|id| Arc::new(Device::new(id, mode)))
        .collect()
}

/// Fast-running configuration for integration tests. `device_count` and
/// `failure_rate` only matter when the registry generates the fleet.
pub fn test_config(max_retries: u32, max_workers: usize) -> SimConfig {
    SimConfig {
        device_count: 1,
        failure_rate: 0.0,
        max_retries,
        timeout: Duration::from_millis(50),
        initial_delay: Duration::from_millis(1),
        backoff_multiplier: 2.0,
        max_workers,
        seed: Some(42),
    }
}
