use anyhow::Result;
use clap::Parser;
use fleetsim::report::{render_json, render_report};
use fleetsim::{run_simulation, SimConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Automation failure simulator - demonstrates resilient automation design
/// with failure injection, retries with exponential backoff, and
/// per-device failure isolation.
#[derive(Parser)]
#[command(name = "fleetsim")]
#[command(about = "Automation failure simulator with retries, backoff, and failure isolation")]
#[command(version = "1.0.0")]
struct Cli {
    /// Number of devices to simulate
    #[arg(long, default_value_t = 10)]
    devices: usize,

    /// Percentage of devices that should fail (0-100)
    #[arg(long, default_value_t = 30.0)]
    failure_rate: f64,

    /// Maximum retry attempts per device
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Initial retry delay in seconds
    #[arg(long, default_value_t = 1.0)]
    initial_delay: f64,

    /// Exponential backoff multiplier
    #[arg(long, default_value_t = 2.0)]
    backoff: f64,

    /// Maximum concurrent workers
    #[arg(long, default_value_t = 10)]
    max_workers: usize,

    /// RNG seed for a reproducible fleet
    #[arg(long)]
    seed: Option<u64>,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> SimConfig {
        SimConfig {
            device_count: self.devices,
            // The flag speaks percentages like the fleet operators do;
            // the core wants a fraction
            failure_rate: (self.failure_rate / 100.0).clamp(0.0, 1.0),
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.timeout),
            initial_delay: Duration::from_secs_f64(self.initial_delay.max(0.0)),
            backoff_multiplier: self.backoff,
            max_workers: self.max_workers,
            seed: self.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let default_filter = if cli.verbose {
        "fleetsim=debug"
    } else {
        "fleetsim=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = cli.to_config();
    config.validate()?;

    tracing::info!(
        devices = config.device_count,
        failure_rate = config.failure_rate,
        max_retries = config.max_retries,
        max_workers = config.max_workers,
        "starting automation failure simulator"
    );

    let (results, summary) = run_simulation(&config).await?;

    if cli.json {
        println!("{}", render_json(&results, &summary)?);
    } else {
        println!("{}", render_report(&results, &summary));
    }

    Ok(())
}
