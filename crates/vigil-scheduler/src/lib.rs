//! The scheduler service: one timer loop per rule plus the REST control
//! plane that mutates the rule store and the running loops together.

pub mod api;
pub mod config;
pub mod core;
pub mod stats;

#[cfg(test)]
mod tests;

pub use config::SchedulerConfig;
pub use core::SchedulerCore;
pub use stats::SchedulerStats;

use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use vigil_broker::Publish;
use vigil_store::RuleStore;

/// Assembles the store, the scheduling core and the control plane.
pub struct Scheduler {
    listen_address: String,
    store: Arc<dyn RuleStore>,
    core: Arc<SchedulerCore>,
    server: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        store: Arc<dyn RuleStore>,
        publisher: Arc<dyn Publish>,
        stats: Arc<SchedulerStats>,
    ) -> Self {
        Scheduler {
            listen_address: config.listen_address.clone(),
            store,
            core: SchedulerCore::new(publisher, stats),
            server: Mutex::new(None),
        }
    }

    pub fn core(&self) -> &Arc<SchedulerCore> {
        &self.core
    }

    /// Loads every stored rule, starts its loop, and brings up the control
    /// plane. Invalid stored rules are skipped, not fatal.
    pub async fn start(&self) -> Result<()> {
        let rules = self.store.get_all()?;
        let total = rules.len();
        for rule in rules {
            if let Err(e) = rule.validate() {
                tracing::warn!(rule_id = rule.id, error = %e, "Skipping invalid stored rule");
                continue;
            }
            self.core.start(rule).await;
        }
        tracing::info!(
            total,
            active = self.core.active_count().await,
            "Rules loaded"
        );

        let listener = TcpListener::bind(&self.listen_address).await?;
        tracing::info!(addr = %self.listen_address, "Control plane listening");

        let app = api::build_router(api::ApiState {
            store: self.store.clone(),
            core: self.core.clone(),
        });

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "Control plane server error");
            }
        });
        *self.server.lock().await = Some((shutdown_tx, handle));

        Ok(())
    }

    /// Graceful shutdown: control plane first (no more mutations), then
    /// every rule loop, then the store.
    pub async fn stop(&self) {
        if let Some((shutdown_tx, handle)) = self.server.lock().await.take() {
            let _ = shutdown_tx.send(true);
            let _ = handle.await;
        }
        self.core.stop_all().await;
        self.store.close();
        tracing::info!("Scheduler stopped");
    }
}
