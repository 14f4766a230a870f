use crate::core::SchedulerCore;
use crate::stats::SchedulerStats;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use vigil_broker::memory::{MemoryBroker, MemorySubscriber};
use vigil_broker::{BrokerError, Publish, Subscribe};
use vigil_common::{Rule, Task};
use vigil_stats::Registry;

fn make_rule(id: i64, interval: &str, timeout: &str) -> Rule {
    let body = serde_json::to_vec(&serde_json::json!({
        "type": "graphite",
        "check": {
            "graphite_url": "http://graphite.example",
            "query": "pm.*.cpu.user",
            "critical_expression": "> 90"
        },
        "event_identifier_pattern": "cpu.{host}",
        "interval": interval,
        "timeout": timeout
    }))
    .unwrap();
    let mut rule = Rule::from_json(&body).unwrap();
    rule.id = id;
    rule
}

fn make_core(broker: &MemoryBroker) -> (Arc<SchedulerCore>, Arc<SchedulerStats>) {
    let stats = SchedulerStats::register(&Registry::new());
    let core = SchedulerCore::new(Arc::new(broker.publisher("tasks")), stats.clone());
    (core, stats)
}

async fn next_task(sub: &mut MemorySubscriber) -> Task {
    let delivery = tokio::time::timeout(StdDuration::from_secs(120), sub.next())
        .await
        .expect("a task should be emitted within two minutes")
        .expect("subscription should stay healthy")
        .expect("subscription should stay open");
    Task::from_json(&delivery.payload).expect("payload should decode as a task")
}

#[tokio::test(start_paused = true)]
async fn rule_loop_emits_monotone_tasks_until_stopped() {
    let broker = MemoryBroker::new();
    let mut sub = broker.subscriber("tasks", "test");
    let (core, stats) = make_core(&broker);

    let rule = make_rule(1, "10s", "5s");
    core.start(rule.clone()).await;
    assert_eq!(stats.active_rules.load(), 1);

    let mut schedules = Vec::new();
    for _ in 0..3 {
        let task = next_task(&mut sub).await;
        assert_eq!(task.rule_id, 1);
        assert_eq!(task.deadline - task.schedule, rule.timeout.to_chrono());
        assert_eq!(task.expiration - task.schedule, rule.interval.to_chrono());
        schedules.push(task.schedule);
    }
    assert!(
        schedules.windows(2).all(|w| w[0] <= w[1]),
        "per-rule schedules must be monotone"
    );
    assert_eq!(stats.task_scheduled.load(), 3);

    core.stop(1).await;
    assert_eq!(stats.active_rules.load(), 0);

    let quiet = tokio::time::timeout(StdDuration::from_secs(60), sub.next()).await;
    assert!(quiet.is_err(), "no task may be emitted after stop returns");
}

#[tokio::test(start_paused = true)]
async fn paused_rule_is_not_scheduled() {
    let broker = MemoryBroker::new();
    let mut sub = broker.subscriber("tasks", "test");
    let (core, stats) = make_core(&broker);

    let mut rule = make_rule(2, "10s", "5s");
    rule.paused = true;
    core.start(rule).await;

    assert_eq!(core.active_count().await, 0);
    assert_eq!(stats.active_rules.load(), 0);
    let quiet = tokio::time::timeout(StdDuration::from_secs(30), sub.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test(start_paused = true)]
async fn reconcile_applies_the_new_interval() {
    let broker = MemoryBroker::new();
    let mut sub = broker.subscriber("tasks", "test");
    let (core, _stats) = make_core(&broker);

    core.start(make_rule(3, "30s", "10s")).await;
    let task = next_task(&mut sub).await;
    assert_eq!(task.expiration - task.schedule, chrono::Duration::seconds(30));

    core.reconcile(make_rule(3, "5s", "5s")).await;
    assert_eq!(core.active_count().await, 1);

    let task = next_task(&mut sub).await;
    assert_eq!(task.expiration - task.schedule, chrono::Duration::seconds(5));
}

#[tokio::test(start_paused = true)]
async fn reconcile_into_paused_removes_the_loop() {
    let broker = MemoryBroker::new();
    let (core, _stats) = make_core(&broker);

    core.start(make_rule(4, "10s", "5s")).await;
    assert_eq!(core.active_count().await, 1);

    let mut paused = make_rule(4, "10s", "5s");
    paused.paused = true;
    core.reconcile(paused).await;
    assert_eq!(core.active_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent() {
    let broker = MemoryBroker::new();
    let (core, _stats) = make_core(&broker);

    core.stop(99).await;
    core.start(make_rule(5, "10s", "5s")).await;
    core.stop(5).await;
    core.stop(5).await;
    assert_eq!(core.active_count().await, 0);
}

struct FailingPublisher;

#[async_trait]
impl Publish for FailingPublisher {
    async fn publish(&self, _payload: Vec<u8>) -> Result<(), BrokerError> {
        Err(BrokerError::Publish("broker down".to_string()))
    }

    async fn close(&self) {}
}

#[tokio::test(start_paused = true)]
async fn publish_failure_keeps_the_loop_running() {
    let stats = SchedulerStats::register(&Registry::new());
    let core = SchedulerCore::new(Arc::new(FailingPublisher), stats.clone());

    core.start(make_rule(6, "10s", "5s")).await;
    tokio::time::sleep(StdDuration::from_secs(35)).await;

    assert!(stats.task_publish_failed.load() >= 2);
    assert_eq!(stats.task_scheduled.load(), 0);
    assert_eq!(core.active_count().await, 1);
    core.stop(6).await;
}

#[tokio::test(start_paused = true)]
async fn stop_all_drains_every_loop() {
    let broker = MemoryBroker::new();
    let (core, stats) = make_core(&broker);

    core.start(make_rule(7, "10s", "5s")).await;
    core.start(make_rule(8, "20s", "5s")).await;
    assert_eq!(stats.active_rules.load(), 2);

    core.stop_all().await;
    assert_eq!(core.active_count().await, 0);
    assert_eq!(stats.active_rules.load(), 0);
}
