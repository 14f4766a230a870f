//! The vigil binary: one executable, two services. `mode` (from the config
//! file or the invocation name) picks between the rule scheduler and the
//! task executor.

mod config;
mod logging;

use anyhow::Result;
use clap::Parser;
use config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vigil_broker::nats::NatsPublisher;
use vigil_executor::{build_emitter, Executor, ExecutorStats};
use vigil_graphite::CarbonClient;
use vigil_scheduler::{Scheduler, SchedulerStats};
use vigil_stats::{Registry, Reporter};
use vigil_store::{RuleStore, SqliteRuleStore};

/// Distributed monitoring: a rule scheduler and a check executor connected
/// by a message broker.
#[derive(Parser)]
#[command(name = "vigil", version)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Scheduler,
    Executor,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Scheduler => "scheduler",
            Mode::Executor => "executor",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    logging::init(&config.log)?;

    let mode = resolve_mode(config.mode.as_deref())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = mode.as_str(),
        "vigil starting"
    );

    let registry = Registry::new();
    let reporter = if config.stats.enabled {
        let client = CarbonClient::new(&config.stats.url, &config.stats.resolved_prefix());
        let reporter = Reporter::new(registry.clone(), client, config.stats.interval.as_std());
        Some(tokio::spawn(async move { reporter.run().await }))
    } else {
        None
    };

    match mode {
        Mode::Scheduler => run_scheduler(&config, &registry).await?,
        Mode::Executor => run_executor(&config, &registry).await?,
    }

    if let Some(handle) = reporter {
        handle.abort();
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// The config file wins; otherwise the invocation name decides (a symlink
/// named `vigil-scheduler` runs the scheduler).
fn resolve_mode(configured: Option<&str>) -> Result<Mode> {
    let inferred = std::env::args().next().and_then(|argv0| {
        if argv0.ends_with("scheduler") {
            Some("scheduler".to_string())
        } else if argv0.ends_with("executor") {
            Some("executor".to_string())
        } else {
            None
        }
    });

    match configured.map(str::to_string).or(inferred).as_deref() {
        Some("scheduler") => Ok(Mode::Scheduler),
        Some("executor") => Ok(Mode::Executor),
        Some(other) => anyhow::bail!("unknown mode: {other}"),
        None => anyhow::bail!("`mode` must be set in the config file (scheduler or executor)"),
    }
}

async fn run_scheduler(config: &Config, registry: &Registry) -> Result<()> {
    let store: Arc<dyn RuleStore> = Arc::new(SqliteRuleStore::open(
        Path::new(&config.scheduler.db_path),
        &config.scheduler.db_collection,
    )?);
    let publisher = Arc::new(
        NatsPublisher::connect(
            &config.scheduler.broker_publish_addr,
            &config.scheduler.topic,
        )
        .await?,
    );
    let stats = SchedulerStats::register(registry);

    let scheduler = Scheduler::new(&config.scheduler, store, publisher, stats);
    scheduler.start().await?;

    wait_for_stop_signal().await;
    tracing::info!("Stop signal received, stopping scheduler");
    scheduler.stop().await;
    Ok(())
}

async fn run_executor(config: &Config, registry: &Registry) -> Result<()> {
    let emitter = build_emitter(&config.executor.emit).await?;
    let stats = ExecutorStats::register(registry);

    let executor = Executor::new(config.executor.clone(), emitter, stats)?;
    executor.start().await?;

    wait_for_stop_signal().await;
    tracing::info!("Stop signal received, stopping executor");
    executor.stop().await;
    Ok(())
}

async fn wait_for_stop_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
