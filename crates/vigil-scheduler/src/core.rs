use crate::stats::SchedulerStats;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use vigil_broker::Publish;
use vigil_common::{Rule, Task};

/// Handle on one rule's running timer loop.
struct RunningRule {
    stop: oneshot::Sender<()>,
    loop_handle: JoinHandle<()>,
}

/// Owns the map of running rules and the task publisher.
///
/// The map's lock is the synchronization point between the control plane
/// and the loops' lifecycle: every mutation goes through [`start`] /
/// [`stop`] / [`reconcile`], so a handler always observes a consistent
/// view.
///
/// [`start`]: SchedulerCore::start
/// [`stop`]: SchedulerCore::stop
/// [`reconcile`]: SchedulerCore::reconcile
pub struct SchedulerCore {
    rules: Mutex<HashMap<i64, RunningRule>>,
    publisher: Arc<dyn Publish>,
    stats: Arc<SchedulerStats>,
}

impl SchedulerCore {
    pub fn new(publisher: Arc<dyn Publish>, stats: Arc<SchedulerStats>) -> Arc<Self> {
        Arc::new(SchedulerCore {
            rules: Mutex::new(HashMap::new()),
            publisher,
            stats,
        })
    }

    /// Installs `rule` and launches its timer loop. Paused rules are not
    /// installed at all.
    pub async fn start(&self, rule: Rule) {
        if rule.paused {
            tracing::debug!(rule_id = rule.id, "Rule is paused, not scheduling");
            return;
        }

        let id = rule.id;
        let (stop_tx, stop_rx) = oneshot::channel();
        let loop_handle = tokio::spawn(run_loop(
            rule,
            self.publisher.clone(),
            self.stats.clone(),
            stop_rx,
        ));

        let mut rules = self.rules.lock().await;
        if let Some(stale) = rules.insert(id, RunningRule { stop: stop_tx, loop_handle }) {
            // start without a prior stop; don't leak the old loop
            tracing::warn!(rule_id = id, "Replacing an already-running rule loop");
            let _ = stale.stop.send(());
        }
        self.stats.active_rules.set(rules.len() as i64);
        tracing::info!(rule_id = id, "Rule scheduled");
    }

    /// Signals the rule's loop, removes it from the map and waits for the
    /// loop to exit: once this returns no further task is emitted for `id`.
    /// Idempotent.
    pub async fn stop(&self, id: i64) {
        let removed = {
            let mut rules = self.rules.lock().await;
            let removed = rules.remove(&id);
            self.stats.active_rules.set(rules.len() as i64);
            removed
        };

        let Some(running) = removed else { return };
        let _ = running.stop.send(());
        if running.loop_handle.await.is_err() {
            tracing::error!(rule_id = id, "Rule loop panicked");
        }
        tracing::info!(rule_id = id, "Rule unscheduled");
    }

    /// Applies a rule's post-image after an insert or update.
    ///
    /// The transition is not atomic across the broker: a task emitted by
    /// the previous loop may still be in flight, and its expiration is the
    /// backstop on the executor side.
    pub async fn reconcile(&self, rule: Rule) {
        self.stop(rule.id).await;
        self.start(rule).await;
    }

    pub async fn active_count(&self) -> usize {
        self.rules.lock().await.len()
    }

    /// Stops every loop; used on shutdown.
    pub async fn stop_all(&self) {
        let drained: Vec<(i64, RunningRule)> = {
            let mut rules = self.rules.lock().await;
            let drained = rules.drain().collect();
            self.stats.active_rules.set(0);
            drained
        };

        for (id, running) in drained {
            let _ = running.stop.send(());
            if running.loop_handle.await.is_err() {
                tracing::error!(rule_id = id, "Rule loop panicked");
            }
        }
    }
}

/// One rule's timer loop.
///
/// Sleeps a uniform random phase in `[0, interval)` first (rules created
/// together would otherwise tick together forever), then emits one task
/// per interval until stopped. The stop signal is honored between the
/// phase sleep and every tick.
async fn run_loop(
    rule: Rule,
    publisher: Arc<dyn Publish>,
    stats: Arc<SchedulerStats>,
    mut stop: oneshot::Receiver<()>,
) {
    let interval = rule.interval.as_std();

    tokio::select! {
        _ = &mut stop => return,
        _ = tokio::time::sleep(random_phase(interval)) => {}
    }

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        tokio::select! {
            _ = &mut stop => return,
            _ = ticker.tick() => emit_task(&rule, publisher.as_ref(), &stats).await,
        }
    }
}

fn random_phase(interval: StdDuration) -> StdDuration {
    let nanos = interval.as_nanos().min(u64::MAX as u128) as u64;
    if nanos == 0 {
        return StdDuration::ZERO;
    }
    StdDuration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}

/// Materializes and publishes one task. A failed publish is logged and
/// counted; the tick is not retried, the next one emits a fresh task.
async fn emit_task(rule: &Rule, publisher: &dyn Publish, stats: &SchedulerStats) {
    let task = Task::from_rule(rule);
    let payload = match task.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(rule_id = rule.id, error = %e, "Failed to encode task");
            return;
        }
    };

    match publisher.publish(payload).await {
        Ok(()) => {
            stats.task_scheduled.inc();
            tracing::debug!(rule_id = rule.id, schedule = %task.schedule, "Task emitted");
        }
        Err(e) => {
            stats.task_publish_failed.inc();
            tracing::error!(rule_id = rule.id, error = %e, "Failed to publish task");
        }
    }
}
