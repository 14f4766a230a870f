use std::sync::Arc;
use vigil_stats::{Counter, Gauge, Registry};

/// Scheduler-side instruments, registered once at startup.
pub struct SchedulerStats {
    /// Number of rules with a running timer loop.
    pub active_rules: Arc<Gauge>,
    pub task_scheduled: Arc<Counter>,
    pub task_publish_failed: Arc<Counter>,
}

impl SchedulerStats {
    pub fn register(registry: &Registry) -> Arc<Self> {
        Arc::new(SchedulerStats {
            active_rules: registry.gauge("ActiveRules"),
            task_scheduled: registry.counter("TaskScheduled"),
            task_publish_failed: registry.counter("TaskPublishFailed"),
        })
    }
}
