use crate::check::Check;
use crate::duration::Duration;
use crate::error::RuleError;
use crate::event::Status;
use crate::metadata::Metadata;
use crate::rule::Rule;
use crate::task::Task;
use crate::template::IdentifierTemplate;
use crate::threshold::ThresholdExpression;
use serde_json::json;

fn make_rule_json() -> serde_json::Value {
    json!({
        "type": "graphite",
        "check": {
            "graphite_url": "http://graphite.example",
            "query": "pm.*.cpu.user",
            "from": "-1min",
            "until": "now",
            "metadata_extract_pattern": "^(?P<host>[^.]+)\\..*$",
            "critical_expression": "> 90",
            "warning_expression": "> 80",
            "max_null_points": 3
        },
        "metadata": {"env": "prod"},
        "event_identifier_pattern": "cpu.{host}",
        "interval": "10s",
        "timeout": "5s"
    })
}

// ---- durations ----

#[test]
fn duration_parses_simple_and_compound_forms() {
    assert_eq!(Duration::parse("10s").unwrap(), Duration::from_secs(10));
    assert_eq!(Duration::parse("1m30s").unwrap(), Duration::from_secs(90));
    assert_eq!(Duration::parse("2h").unwrap(), Duration::from_secs(7200));
    assert_eq!(Duration::parse("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(Duration::parse("1.5s").unwrap(), Duration::from_millis(1500));
    assert_eq!(
        Duration::parse("3us").unwrap(),
        Duration::from_std(std::time::Duration::from_micros(3))
    );
}

#[test]
fn duration_rejects_garbage() {
    for bad in ["", "10", "s", "-5s", "5 s", "10x", "1m30"] {
        assert!(Duration::parse(bad).is_err(), "{bad:?} should not parse");
    }
}

#[test]
fn duration_display_survives_round_trip() {
    for d in [
        Duration::from_secs(10),
        Duration::from_secs(90),
        Duration::from_secs(3600),
        Duration::from_millis(1500),
        Duration::ZERO,
    ] {
        assert_eq!(Duration::parse(&d.to_string()).unwrap(), d);
    }
}

// ---- threshold expressions ----

#[test]
fn threshold_numeric_operators_compare() {
    let cases = [
        ("> 90", 95.0, true),
        ("> 90", 90.0, false),
        (">= 90", 90.0, true),
        ("== 1.5", 1.5, true),
        ("!= 1.5", 1.5, false),
        ("<= -1", -2.0, true),
        ("< 0", 0.0, false),
    ];
    for (source, value, hit) in cases {
        let expr = ThresholdExpression::parse(source).unwrap();
        assert_eq!(expr.evaluate(value, false), (hit, false), "{source}");
    }
}

#[test]
fn threshold_numeric_operator_on_absent_value_is_unknown() {
    let expr = ThresholdExpression::parse("> 1").unwrap();
    assert_eq!(expr.evaluate(0.0, true), (false, true));
}

#[test]
fn threshold_null_operators_test_presence() {
    let eq = ThresholdExpression::parse("== nil").unwrap();
    assert_eq!(eq.evaluate(0.0, true), (true, false));
    assert_eq!(eq.evaluate(0.0, false), (false, false));

    let ne = ThresholdExpression::parse("!= nil").unwrap();
    assert_eq!(ne.evaluate(0.0, true), (false, false));
    assert_eq!(ne.evaluate(0.0, false), (true, false));
}

#[test]
fn threshold_empty_expression_never_contributes() {
    let expr = ThresholdExpression::parse("").unwrap();
    assert!(!expr.is_configured());
    assert_eq!(expr.evaluate(123.0, false), (false, false));
    assert_eq!(expr.evaluate(123.0, true), (false, false));
}

#[test]
fn threshold_rejects_malformed_expressions() {
    for bad in ["=> 1", "> ", "nil", "== null", "90 >", "> 1 > 2"] {
        assert!(
            matches!(
                ThresholdExpression::parse(bad),
                Err(RuleError::InvalidExpression(_))
            ),
            "{bad:?} should not parse"
        );
    }
}

#[test]
fn threshold_parse_is_deterministic_across_calls() {
    let a = ThresholdExpression::parse(">= 42.5").unwrap();
    let b = ThresholdExpression::parse(">= 42.5").unwrap();
    assert_eq!(a, b);
}

// ---- identifier templates ----

#[test]
fn template_substitutes_every_occurrence() {
    let template = IdentifierTemplate::compile("{host}.cpu.{host}.{core}");
    let metadata: Metadata = [("host", "srv1"), ("core", "0")].into_iter().collect();
    assert_eq!(template.resolve(&metadata), "srv1.cpu.srv1.0");
}

#[test]
fn template_leaves_missing_keys_literal() {
    let template = IdentifierTemplate::compile("cpu.{host}.{dc}");
    let metadata: Metadata = [("host", "srv1")].into_iter().collect();
    assert_eq!(template.resolve(&metadata), "cpu.srv1.{dc}");
}

#[test]
fn template_renders_non_string_values_bare() {
    let template = IdentifierTemplate::compile("shard.{n}");
    let mut metadata = Metadata::new();
    metadata.insert("n", 7);
    assert_eq!(template.resolve(&metadata), "shard.7");
}

// ---- metadata ----

#[test]
fn metadata_merge_prefers_other() {
    let mut base: Metadata = [("env", "prod"), ("host", "old")].into_iter().collect();
    let extracted: Metadata = [("host", "srv1")].into_iter().collect();
    base.merge(&extracted);
    assert_eq!(base.get_str("host").as_deref(), Some("srv1"));
    assert_eq!(base.get_str("env").as_deref(), Some("prod"));
}

// ---- status ----

#[test]
fn status_serializes_as_integer() {
    assert_eq!(serde_json::to_string(&Status::Critical).unwrap(), "2");
    assert_eq!(serde_json::from_str::<Status>("3").unwrap(), Status::Unknown);
    assert!(serde_json::from_str::<Status>("4").is_err());
}

// ---- rules ----

#[test]
fn rule_decodes_with_defaults_applied() {
    let mut value = make_rule_json();
    value.as_object_mut().unwrap().remove("timeout");
    let check = value["check"].as_object_mut().unwrap();
    check.remove("from");
    check.remove("until");
    let body = serde_json::to_vec(&value).unwrap();

    let rule = Rule::from_json(&body).unwrap();
    assert_eq!(rule.timeout, rule.interval);
    let Check::Graphite(check) = &rule.check;
    assert_eq!(check.from, "-5min");
    assert_eq!(check.until, "now");
    assert!(rule.validate().is_ok());
}

#[test]
fn rule_rejects_unknown_type() {
    let mut value = make_rule_json();
    value["type"] = json!("elasticsearch");
    let err = Rule::from_json(&serde_json::to_vec(&value).unwrap()).unwrap_err();
    assert!(err.to_string().contains("elasticsearch"));
}

#[test]
fn rule_validate_rejects_timeout_above_interval() {
    let mut value = make_rule_json();
    value["timeout"] = json!("30s");
    let rule = Rule::from_json(&serde_json::to_vec(&value).unwrap()).unwrap();
    assert!(matches!(
        rule.validate(),
        Err(RuleError::InvalidTimeout { .. })
    ));
}

#[test]
fn rule_validate_rejects_missing_query() {
    let mut value = make_rule_json();
    value["check"]["query"] = json!("");
    let rule = Rule::from_json(&serde_json::to_vec(&value).unwrap()).unwrap();
    assert!(matches!(rule.validate(), Err(RuleError::MissingQuery)));
}

#[test]
fn rule_validate_requires_one_threshold() {
    let mut value = make_rule_json();
    value["check"]["critical_expression"] = json!("");
    value["check"]["warning_expression"] = json!("");
    let rule = Rule::from_json(&serde_json::to_vec(&value).unwrap()).unwrap();
    assert!(matches!(rule.validate(), Err(RuleError::MissingExpression)));
}

#[test]
fn rule_validate_rejects_bad_extract_pattern() {
    let mut value = make_rule_json();
    value["check"]["metadata_extract_pattern"] = json!("(unclosed");
    let rule = Rule::from_json(&serde_json::to_vec(&value).unwrap()).unwrap();
    assert!(matches!(rule.validate(), Err(RuleError::InvalidPattern(_))));
}

#[test]
fn rule_id_is_serialized_only_when_assigned() {
    let mut rule = Rule::from_json(&serde_json::to_vec(&make_rule_json()).unwrap()).unwrap();

    // unassigned id (a document about to be stored) stays out of the JSON
    let doc: serde_json::Value = serde_json::from_slice(&rule.to_json().unwrap()).unwrap();
    assert!(doc.get("id").is_none());

    // assigned id (an api response) is included
    rule.id = 42;
    let doc: serde_json::Value = serde_json::from_slice(&rule.to_json().unwrap()).unwrap();
    assert_eq!(doc["id"], json!(42));
}

// ---- tasks ----

#[test]
fn task_snapshot_carries_deadline_and_expiration() {
    let rule = {
        let mut rule = Rule::from_json(&serde_json::to_vec(&make_rule_json()).unwrap()).unwrap();
        rule.id = 7;
        rule
    };

    let task = Task::from_rule(&rule);
    assert_eq!(task.rule_id, 7);
    assert_eq!(task.deadline - task.schedule, rule.timeout.to_chrono());
    assert_eq!(task.expiration - task.schedule, rule.interval.to_chrono());
    assert!(task.deadline <= task.expiration);
    assert!(!task.is_expired(task.schedule));
    assert!(task.is_expired(task.expiration + chrono::Duration::seconds(1)));
}

#[test]
fn task_codec_round_trips() {
    let mut rule = Rule::from_json(&serde_json::to_vec(&make_rule_json()).unwrap()).unwrap();
    rule.id = 3;
    let task = Task::from_rule(&rule);

    let decoded = Task::from_json(&task.to_json().unwrap()).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn task_wire_format_keeps_type_and_check_as_siblings() {
    let rule = Rule::from_json(&serde_json::to_vec(&make_rule_json()).unwrap()).unwrap();
    let task = Task::from_rule(&rule);

    let wire: serde_json::Value = serde_json::from_slice(&task.to_json().unwrap()).unwrap();
    assert_eq!(wire["type"], json!("graphite"));
    assert_eq!(wire["check"]["query"], json!("pm.*.cpu.user"));
    assert!(wire["schedule"].is_string());
}

#[test]
fn graphite_check_defaults_allow_minimal_document() {
    let body = serde_json::to_vec(&json!({
        "type": "graphite",
        "check": {
            "graphite_url": "http://g",
            "query": "a.b.c",
            "critical_expression": "== nil"
        },
        "interval": "10s"
    }))
    .unwrap();

    let rule = Rule::from_json(&body).unwrap();
    assert!(rule.validate().is_ok());
    let Check::Graphite(check) = &rule.check;
    assert_eq!(check.max_null_points, 0);
    assert!(!check.warning_expression.is_configured());
    assert_eq!(Rule::from_json(&rule.to_json().unwrap()).unwrap(), rule);
}
