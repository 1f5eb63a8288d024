use fleetsim::devices::Device;
use fleetsim::failures::{AttemptOutcome, FailureInjector, InjectedAttempt};
use fleetsim::SimResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn instant_success() -> SimResult<InjectedAttempt> {
    Ok(InjectedAttempt {
        outcome: AttemptOutcome::Success {
            operations: Vec::new(),
        },
        latency: Duration::ZERO,
    })
}

/// Tracks how many attempts are in flight at once.
///
/// `inject` holds its slot for a short blocking window so overlapping
/// workers are observable, then records the high-water mark.
pub struct ConcurrencyGauge {
    active: AtomicUsize,
    high_water: AtomicUsize,
    hold: Duration,
}

impl ConcurrencyGauge {
    pub fn new(hold: Duration) -> Self {
        Self {
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            hold,
        }
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

impl FailureInjector for ConcurrencyGauge {
    fn inject(
        &self,
        _device: &Device,
        _attempt_number: u32,
        _timeout: Duration,
    ) -> SimResult<InjectedAttempt> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now_active, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.active.fetch_sub(1, Ordering::SeqCst);
        instant_success()
    }
}

/// Panics for the victim device and succeeds for everyone else - exercises
/// the dispatcher's outermost isolation ring.
pub struct PanicsFor {
    pub victim: String,
}

impl FailureInjector for PanicsFor {
    fn inject(
        &self,
        device: &Device,
        _attempt_number: u32,
        _timeout: Duration,
    ) -> SimResult<InjectedAttempt> {
        if device.name == self.victim {
            panic!("injected worker fault for {}", device.name);
        }
        instant_success()
    }
}
