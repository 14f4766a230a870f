//! The executor service: a pool of workers that consume tasks from the
//! broker, run the check they describe, filter the resulting events and
//! hand the survivors to the configured sink.

pub mod config;
pub mod emit;
pub mod filter;
pub mod graphite;
pub mod stats;


pub use config::{EmitConfig, ExecutorConfig};
pub use emit::{build_emitter, Emit, EmitError};
pub use filter::{EventFilter, FilterMode};
pub use stats::ExecutorStats;

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use vigil_broker::nats::NatsSubscriber;
use vigil_broker::{BrokerError, Delivery, Subscribe};
use vigil_common::{Check, Event, Task};
use vigil_graphite::RenderClient;

/// Everything a worker needs to process one delivery.
pub(crate) struct Shared {
    pub(crate) emitter: Box<dyn Emit>,
    pub(crate) filter: EventFilter,
    pub(crate) stats: Arc<ExecutorStats>,
    pub(crate) render: RenderClient,
}

pub struct Executor {
    config: ExecutorConfig,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Executor {
    pub fn new(
        config: ExecutorConfig,
        emitter: Box<dyn Emit>,
        stats: Arc<ExecutorStats>,
    ) -> Result<Self> {
        let mode = FilterMode::try_from(config.emit.filter_mode)
            .map_err(|e| anyhow::anyhow!("invalid emit config: {e}"))?;
        let (shutdown, _) = watch::channel(false);
        Ok(Executor {
            config,
            shared: Arc::new(Shared {
                emitter,
                filter: EventFilter::new(mode),
                stats,
                render: RenderClient::new(),
            }),
            shutdown,
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Subscribes `num_workers` workers to the task topic and starts them.
    /// A failed subscription aborts startup.
    pub async fn start(&self) -> Result<(), BrokerError> {
        let mut subscribers: Vec<Box<dyn Subscribe + Send>> = Vec::new();
        for _ in 0..self.config.num_workers.max(1) {
            let subscriber = NatsSubscriber::subscribe(
                &self.config.broker_lookup_addr,
                &self.config.topic,
                &self.config.channel,
            )
            .await?;
            subscribers.push(Box::new(subscriber));
        }
        self.launch(subscribers).await;
        tracing::info!(
            workers = self.config.num_workers.max(1),
            topic = %self.config.topic,
            channel = %self.config.channel,
            "Executor started"
        );
        Ok(())
    }

    /// Starts one worker per subscriber. Exposed so in-process buses can
    /// drive the pool without a broker.
    pub async fn launch(&self, subscribers: Vec<Box<dyn Subscribe + Send>>) {
        let mut workers = self.workers.lock().await;
        for subscriber in subscribers {
            let worker = workers.len();
            let shared = self.shared.clone();
            let shutdown = self.shutdown.subscribe();
            workers.push(tokio::spawn(worker_loop(worker, subscriber, shared, shutdown)));
        }
    }

    /// Signals every worker and waits for in-flight handlers to finish.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for handle in workers {
            if handle.await.is_err() {
                tracing::error!("Worker task panicked");
            }
        }
        self.shared.emitter.close().await;
        tracing::info!("Executor stopped");
    }
}

async fn worker_loop(
    worker: usize,
    mut subscriber: Box<dyn Subscribe + Send>,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            delivery = subscriber.next() => match delivery {
                Ok(Some(delivery)) => handle_delivery(worker, delivery, &shared).await,
                Ok(None) => {
                    tracing::info!(worker, "Subscription closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(worker, error = %e, "Consume failed");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
    subscriber.unsubscribe().await;
    tracing::debug!(worker, "Worker stopped");
}

/// Processes one delivery and always acks it afterwards: a decode failure
/// will not improve on redelivery, and an executed task must not run twice
/// on this channel.
pub(crate) async fn handle_delivery(worker: usize, delivery: Delivery, shared: &Arc<Shared>) {
    shared.stats.task_received.inc();

    match Task::from_json(&delivery.payload) {
        Err(e) => {
            tracing::error!(worker, error = %e, "Failed to decode task");
        }
        Ok(task) => {
            let now = Utc::now();
            if task.is_expired(now) {
                shared.stats.task_expired.inc();
                tracing::warn!(
                    worker,
                    rule_id = task.rule_id,
                    schedule = %task.schedule,
                    expiration = %task.expiration,
                    "Dropping expired task"
                );
            } else {
                dispatch(task, shared).await;
                shared.stats.task_executed.inc();
            }
        }
    }

    delivery.ack().await;
}

/// Runs the check in its own task; the `JoinError` boundary keeps a
/// panicking check from taking the worker down.
async fn dispatch(task: Task, shared: &Arc<Shared>) {
    let rule_id = task.rule_id;
    let shared = shared.clone();
    let handle = tokio::spawn(async move {
        let Check::Graphite(check) = task.check.clone();
        graphite::run_check(&task, &check, &shared).await;
    });
    if handle.await.is_err() {
        tracing::error!(rule_id, "Check execution panicked");
    }
}

/// Counts, filters and emits one event.
pub(crate) async fn emit_event(shared: &Shared, event: Event) {
    shared.stats.count_status(event.status);
    shared.stats.event_emitted.inc();

    if !shared.filter.should_emit(&event) {
        tracing::debug!(identifier = %event.identifier, "Event suppressed by filter");
        return;
    }

    if let Err(e) = shared.emitter.emit(&event).await {
        shared.stats.emit_failed.inc();
        tracing::error!(identifier = %event.identifier, error = %e, "Failed to emit event");
    }
}
