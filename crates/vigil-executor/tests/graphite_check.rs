//! End-to-end: a task travels through the worker pool, a canned Graphite
//! backend answers the render query, and the resulting event lands in a
//! file sink.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use vigil_broker::memory::MemoryBroker;
use vigil_broker::{Publish, Subscribe};
use vigil_common::{Rule, Task};
use vigil_executor::{build_emitter, EmitConfig, Executor, ExecutorConfig, ExecutorStats};
use vigil_stats::Registry;

async fn serve_render(response: Value) -> SocketAddr {
    let app = Router::new().route(
        "/render/",
        get(move || {
            let response = response.clone();
            async move { Json(response) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("stub should bind");
    let addr = listener.local_addr().expect("stub should have an address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn make_task(graphite_addr: SocketAddr) -> Task {
    let body = serde_json::to_vec(&json!({
        "type": "graphite",
        "check": {
            "graphite_url": format!("http://{graphite_addr}"),
            "query": "a.b.c",
            "from": "-1min",
            "until": "now",
            "critical_expression": "> 90",
            "warning_expression": "> 80",
            "max_null_points": 3,
            "metadata_extract_pattern": "^(?P<host>[^.]+)\\..*$"
        },
        "metadata": {"env": "prod"},
        "event_identifier_pattern": "cpu.{host}",
        "interval": "10s",
        "timeout": "5s"
    }))
    .expect("rule json should encode");
    let mut rule = Rule::from_json(&body).expect("rule should decode");
    rule.id = 42;
    Task::from_rule(&rule)
}

async fn build_executor(
    dir: &tempfile::TempDir,
) -> (Executor, Arc<ExecutorStats>, std::path::PathBuf) {
    let out_path = dir.path().join("events.jsonl");
    let config = ExecutorConfig {
        emit: EmitConfig {
            kind: "file".to_string(),
            filename: out_path.to_string_lossy().to_string(),
            ..EmitConfig::default()
        },
        ..ExecutorConfig::default()
    };
    let emitter = build_emitter(&config.emit).await.expect("file sink should open");
    let stats = ExecutorStats::register(&Registry::new());
    let executor = Executor::new(config, emitter, stats.clone()).expect("executor should build");
    (executor, stats, out_path)
}

async fn wait_for_line(path: &std::path::Path) -> String {
    for _ in 0..100 {
        if let Ok(content) = std::fs::read_to_string(path) {
            if content.contains('\n') {
                return content;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no event was written to the sink in time");
}

#[tokio::test]
async fn task_round_trip_produces_a_critical_event() {
    let graphite = serve_render(json!([
        {"target": "srv1.cpu.user", "datapoints": [[50.0, 1660000000], [95.0, 1660000060]]}
    ]))
    .await;

    let dir = tempfile::tempdir().expect("tempdir should create");
    let (executor, stats, out_path) = build_executor(&dir).await;

    let broker = MemoryBroker::new();
    let subscriber = broker.subscriber("vigil_tasks", "vigil_task_executor");
    executor.launch(vec![Box::new(subscriber)]).await;

    broker
        .publisher("vigil_tasks")
        .publish(make_task(graphite).to_json().expect("task should encode"))
        .await
        .expect("publish should succeed");

    let content = wait_for_line(&out_path).await;
    executor.stop().await;

    let event: Value =
        serde_json::from_str(content.lines().next().expect("one line")).expect("event json");
    assert_eq!(event["status"], json!(2));
    assert_eq!(event["identifier"], json!("cpu.srv1"));
    assert_eq!(event["metadata"]["env"], json!("prod"));
    assert_eq!(event["metadata"]["host"], json!("srv1"));
    assert_eq!(event["type"], json!("graphite"));
    assert_eq!(event["result"]["metric_value"], json!(95.0));
    assert_eq!(event["rule_id"], json!(42));

    assert_eq!(stats.task_received.load(), 1);
    assert_eq!(stats.task_executed.load(), 1);
    assert_eq!(stats.graphite.metrics_received.load(), 1);
    assert_eq!(stats.event_critical.load(), 1);
}

#[tokio::test]
async fn expired_task_is_dropped_by_the_pool() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let (executor, stats, out_path) = build_executor(&dir).await;

    let broker = MemoryBroker::new();
    let subscriber = broker.subscriber("vigil_tasks", "vigil_task_executor");
    executor.launch(vec![Box::new(subscriber)]).await;

    let mut task = make_task("127.0.0.1:9".parse().expect("addr"));
    task.schedule = task.schedule - chrono::Duration::seconds(60);
    task.deadline = task.schedule + chrono::Duration::seconds(5);
    task.expiration = task.schedule + chrono::Duration::seconds(10);

    broker
        .publisher("vigil_tasks")
        .publish(task.to_json().expect("task should encode"))
        .await
        .expect("publish should succeed");

    // give the worker a moment to pick it up
    for _ in 0..100 {
        if stats.task_expired.load() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    executor.stop().await;

    assert_eq!(stats.task_received.load(), 1);
    assert_eq!(stats.task_expired.load(), 1);
    assert_eq!(stats.task_executed.load(), 0);
    assert_eq!(
        std::fs::read_to_string(&out_path).unwrap_or_default(),
        "",
        "an expired task must not produce events"
    );
}
