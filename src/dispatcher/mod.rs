/// Concurrent dispatcher - bounded fan-out of retry sequences
///
/// One tokio task per device, gated by a semaphore holding `max_workers`
/// permits. A device keeps its permit for its entire attempt sequence, so
/// at most `max_workers` devices are ever mid-attempt. Results are
/// collected in completion order - a slow device never blocks the rest -
/// and a panicking worker is converted into a synthetic failed result.
/// This is the outermost isolation ring: `run_all` always returns one
/// result per device.
use crate::devices::{Device, DeviceRegistry};
use crate::failures::{FailureInjector, SimulatedFailures};
use crate::report::SimulationSummary;
use crate::retry::{process_device, DeviceResult, RetryPolicy};
use crate::{SimConfig, SimResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Run the retry engine for every device, at most `config.max_workers`
/// concurrently. Returns one result per device, in completion order.
pub async fn run_all(
    devices: Vec<Arc<Device>>,
    injector: Arc<dyn FailureInjector>,
    config: &SimConfig,
) -> Vec<DeviceResult> {
    let run_id = Uuid::new_v4();
    let policy = RetryPolicy::from(config);
    let semaphore = Arc::new(Semaphore::new(config.max_workers));
    let total = devices.len();

    tracing::info!(
        %run_id,
        devices = total,
        max_workers = config.max_workers,
        max_retries = policy.max_retries,
        "dispatching fleet"
    );

    let mut workers = JoinSet::new();
    for device in devices {
        let injector = Arc::clone(&injector);
        let semaphore = Arc::clone(&semaphore);
        let policy = policy.clone();

        workers.spawn(async move {
            // Hold one permit for the device's entire attempt sequence
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("dispatcher semaphore closed");

            let processing = process_device(injector.as_ref(), Arc::clone(&device), &policy);
            match AssertUnwindSafe(processing).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    // A fault escaped the retry engine's containment; the
                    // batch still owes a result for this device.
                    let detail = panic_detail(payload);
                    tracing::error!(
                        device = %device.name,
                        detail = %detail,
                        "worker fault contained by dispatcher"
                    );
                    DeviceResult::internal_failure(device, detail)
                }
            }
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => {
                tracing::debug!(
                    %run_id,
                    device = %result.device.name,
                    status = %result.final_status,
                    completed = results.len() + 1,
                    total,
                    "collected device result"
                );
                results.push(result);
            }
            Err(join_error) => {
                // Panics are absorbed inside the task; only cancellation
                // lands here, and the dispatcher never cancels.
                tracing::error!(%run_id, error = %join_error, "worker task lost");
            }
        }
    }

    tracing::info!(%run_id, results = results.len(), "fleet dispatch complete");
    results
}

/// Generate a fleet from `config`, run it, and fold the summary - the
/// wiring the binary uses, exposed for embedding and tests.
pub async fn run_simulation(
    config: &SimConfig,
) -> SimResult<(Vec<DeviceResult>, SimulationSummary)> {
    config.validate()?;

    let registry = DeviceRegistry::generate(config);
    let injector: Arc<dyn FailureInjector> = Arc::new(SimulatedFailures::new(config.seed));

    let started = Instant::now();
    let results = run_all(registry.into_devices(), injector, config).await;
    let summary = SimulationSummary::from_results(&results, started.elapsed());

    Ok((results, summary))
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}
