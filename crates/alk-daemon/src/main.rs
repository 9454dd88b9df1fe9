//! alk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads and validates
//! configuration, wires the platform client / notifier / durable stores
//! into a Reconciler, and hands it to the scheduler loop.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use alk_amp::AmpClient;
use alk_daemon::scheduler;
use alk_events::TriggerSet;
use alk_notify::MailAlertNotifier;
use alk_reconcile::Reconciler;
use alk_state::{CheckpointStore, InFlightRegistry};

#[derive(Parser)]
#[command(name = "alk-daemon")]
#[command(about = "airlock: endpoint auto-scan & isolation daemon", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Override the configured state directory.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Override the configured polling interval, in seconds.
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Run exactly one reconciliation cycle, then exit.
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    let loaded = alk_config::load(&cli.config)?;
    let cfg = loaded.config;
    info!(config_hash = %loaded.config_hash, "configuration loaded");

    let creds = alk_config::resolve_amp_credentials(&cfg.amp)?;

    let amp = AmpClient::new(cfg.amp.base_url.as_str(), creds.client_id, creds.api_key)
        .context("build platform client")?;
    let notifier = MailAlertNotifier::new(
        &cfg.alerting.relay_host,
        cfg.alerting.relay_port,
        &cfg.alerting.from,
        &cfg.alerting.to,
    )
    .context("build alert notifier")?;

    let state_dir = cli
        .state_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.state_dir));
    let checkpoint = CheckpointStore::new(state_dir.join("last_cycle_ts"));
    let registry = InFlightRegistry::open(state_dir.join("inflight_hosts"))
        .context("open in-flight registry")?;
    info!(
        state_dir = %state_dir.display(),
        inflight = registry.len(),
        "durable state opened"
    );

    let mut rec = Reconciler {
        feed: amp.clone(),
        actuator: amp,
        notifier,
        checkpoint,
        registry,
        triggers: TriggerSet::from_iter(cfg.trigger_event_types.iter().cloned()),
    };

    if cli.once {
        if !scheduler::run_one(&mut rec).await {
            bail!("RECONCILE_CYCLE_FAILED single cycle did not complete");
        }
        return Ok(());
    }

    let interval = Duration::from_secs(cli.interval_secs.unwrap_or(cfg.poll_interval_secs));
    info!(interval_secs = interval.as_secs(), "starting poll loop");

    tokio::select! {
        _ = scheduler::run_forever(rec, interval) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received; exiting");
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
