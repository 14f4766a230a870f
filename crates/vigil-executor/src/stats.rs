use std::sync::Arc;
use vigil_common::Status;
use vigil_stats::{Counter, Registry};

/// Executor-side instruments, registered once at startup.
pub struct ExecutorStats {
    pub task_received: Arc<Counter>,
    pub task_executed: Arc<Counter>,
    pub task_expired: Arc<Counter>,
    pub event_emitted: Arc<Counter>,
    pub emit_failed: Arc<Counter>,

    pub event_ok: Arc<Counter>,
    pub event_warning: Arc<Counter>,
    pub event_critical: Arc<Counter>,
    pub event_unknown: Arc<Counter>,

    pub graphite: GraphiteExecutorStats,
}

/// Instruments scoped to the graphite check runtime.
pub struct GraphiteExecutorStats {
    pub task_executed: Arc<Counter>,
    pub event_emitted: Arc<Counter>,
    pub api_request_total: Arc<Counter>,
    pub api_request_failed: Arc<Counter>,
    pub metrics_received: Arc<Counter>,

    pub event_ok: Arc<Counter>,
    pub event_warning: Arc<Counter>,
    pub event_critical: Arc<Counter>,
    pub event_unknown: Arc<Counter>,
}

impl ExecutorStats {
    pub fn register(registry: &Registry) -> Arc<Self> {
        Arc::new(ExecutorStats {
            task_received: registry.counter("TaskReceived"),
            task_executed: registry.counter("TaskExecuted"),
            task_expired: registry.counter("TaskExpired"),
            event_emitted: registry.counter("EventEmitted"),
            emit_failed: registry.counter("EmitFailed"),
            event_ok: registry.counter("EventOK"),
            event_warning: registry.counter("EventWarning"),
            event_critical: registry.counter("EventCritical"),
            event_unknown: registry.counter("EventUnknown"),
            graphite: GraphiteExecutorStats {
                task_executed: registry.counter("GraphiteExecutor.TaskExecuted"),
                event_emitted: registry.counter("GraphiteExecutor.EventEmitted"),
                api_request_total: registry.counter("GraphiteExecutor.APIRequestTotal"),
                api_request_failed: registry.counter("GraphiteExecutor.APIRequestFailed"),
                metrics_received: registry.counter("GraphiteExecutor.MetricsReceived"),
                event_ok: registry.counter("GraphiteExecutor.EventOK"),
                event_warning: registry.counter("GraphiteExecutor.EventWarning"),
                event_critical: registry.counter("GraphiteExecutor.EventCritical"),
                event_unknown: registry.counter("GraphiteExecutor.EventUnknown"),
            },
        })
    }

    pub fn count_status(&self, status: Status) {
        match status {
            Status::Ok => self.event_ok.inc(),
            Status::Warning => self.event_warning.inc(),
            Status::Critical => self.event_critical.inc(),
            Status::Unknown => self.event_unknown.inc(),
        }
    }
}

impl GraphiteExecutorStats {
    pub fn count_status(&self, status: Status) {
        match status {
            Status::Ok => self.event_ok.inc(),
            Status::Warning => self.event_warning.inc(),
            Status::Critical => self.event_critical.inc(),
            Status::Unknown => self.event_unknown.inc(),
        }
    }
}
