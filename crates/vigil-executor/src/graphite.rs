//! The graphite check runtime: query, metadata extraction, threshold
//! resolution and event construction, bounded by the task's deadline.

use crate::Shared;
use chrono::{DateTime, Utc};
use regex::Regex;
use vigil_common::{
    CheckOutcome, Event, GraphiteCheck, GraphiteResult, IdentifierTemplate, Metadata, Status,
    Task, ThresholdExpression,
};
use vigil_graphite::RenderSeries;

pub(crate) async fn run_check(task: &Task, check: &GraphiteCheck, shared: &Shared) {
    let stats = &shared.stats.graphite;
    let begin = Utc::now();

    stats.api_request_total.inc();
    let series = match shared
        .render
        .query(
            &check.graphite_url,
            &check.query,
            &check.from,
            &check.until,
            task.deadline,
        )
        .await
    {
        Ok(series) => series,
        Err(e) => {
            stats.api_request_failed.inc();
            stats.task_executed.inc();
            tracing::error!(rule_id = task.rule_id, error = %e, "Graphite query failed");
            return;
        }
    };
    stats.metrics_received.add(series.len() as u64);
    tracing::debug!(
        rule_id = task.rule_id,
        series = series.len(),
        "Render response received"
    );

    // validated when the rule was accepted; a failure here means the task
    // was hand-crafted, and yields no events
    let extract = match vigil_common::regexp::compile(&check.metadata_extract_pattern) {
        Ok(extract) => extract,
        Err(e) => {
            stats.task_executed.inc();
            tracing::error!(rule_id = task.rule_id, error = %e, "Bad metadata extract pattern");
            return;
        }
    };
    let template = IdentifierTemplate::compile(&task.event_identifier_pattern);

    for one in &series {
        let event = evaluate_series(task, check, &extract, &template, one, begin);
        stats.count_status(event.status);
        stats.event_emitted.inc();
        crate::emit_event(shared, event).await;
    }
    stats.task_executed.inc();
}

/// Compares one series against the thresholds and builds its event.
pub(crate) fn evaluate_series(
    task: &Task,
    check: &GraphiteCheck,
    extract: &Regex,
    template: &IdentifierTemplate,
    series: &RenderSeries,
    check_timestamp: DateTime<Utc>,
) -> Event {
    let mut extracted = Metadata::new();
    if let Some(captures) = extract.captures(&series.target) {
        for name in extract.capture_names().flatten() {
            if let Some(group) = captures.name(name) {
                extracted.insert(name, group.as_str());
            }
        }
    }

    let (value, sample_ts, absent) = match series.last_non_null(check.max_null_points) {
        Some((value, ts)) => (value, ts, false),
        None => (0.0, 0, true),
    };

    let status = resolve_status(
        &check.critical_expression,
        &check.warning_expression,
        value,
        absent,
    );

    let mut metadata = task.metadata.clone();
    metadata.merge(&extracted);
    let identifier = template.resolve(&metadata);

    Event {
        source: "rule".to_string(),
        timestamp: Utc::now(),
        rule_id: task.rule_id,
        status,
        identifier,
        metadata,
        outcome: CheckOutcome::Graphite(GraphiteResult {
            metric_name: series.target.clone(),
            metric_timestamp: DateTime::from_timestamp(sample_ts, 0).unwrap_or_default(),
            metric_value: value,
            metric_value_absent: absent,
            check_timestamp,
            metadata: extracted,
        }),
    }
}

/// Critical wins over warning; an unknown from either side surfaces only
/// when neither hits.
pub(crate) fn resolve_status(
    critical: &ThresholdExpression,
    warning: &ThresholdExpression,
    value: f64,
    absent: bool,
) -> Status {
    let (critical_hit, critical_unknown) = critical.evaluate(value, absent);
    if critical_hit {
        return Status::Critical;
    }

    let (warning_hit, warning_unknown) = warning.evaluate(value, absent);
    if warning_hit {
        return Status::Warning;
    }

    if critical_unknown || warning_unknown {
        return Status::Unknown;
    }
    Status::Ok
}
