use crate::sqlite::SqliteRuleStore;
use crate::{RuleStore, StoreError};
use serde_json::json;
use vigil_common::Rule;

fn make_rule(query: &str) -> Rule {
    let body = serde_json::to_vec(&json!({
        "type": "graphite",
        "check": {
            "graphite_url": "http://graphite.example",
            "query": query,
            "critical_expression": "> 90"
        },
        "metadata": {"env": "test"},
        "event_identifier_pattern": "cpu.{host}",
        "interval": "10s",
        "timeout": "5s"
    }))
    .unwrap();
    Rule::from_json(&body).unwrap()
}

fn open_store() -> SqliteRuleStore {
    SqliteRuleStore::open_in_memory("rules").unwrap()
}

#[test]
fn insert_assigns_ids_and_get_reads_back() {
    let store = open_store();

    let rule = make_rule("a.b.c");
    let id = store.insert(&rule).unwrap();
    assert!(id > 0);

    let loaded = store.get(id).unwrap().expect("rule should exist");
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.event_identifier_pattern, rule.event_identifier_pattern);

    let second = store.insert(&make_rule("d.e.f")).unwrap();
    assert_ne!(id, second);
}

#[test]
fn get_missing_id_is_none() {
    let store = open_store();
    assert!(store.get(999).unwrap().is_none());
}

#[test]
fn update_replaces_document() {
    let store = open_store();
    let id = store.insert(&make_rule("a.b.c")).unwrap();

    let replacement = make_rule("x.y.z");
    store.update(id, &replacement).unwrap();

    let loaded = store.get(id).unwrap().expect("rule should exist");
    let vigil_common::Check::Graphite(check) = &loaded.check;
    assert_eq!(check.query, "x.y.z");
    assert_eq!(loaded.id, id);
}

#[test]
fn update_and_delete_missing_report_not_found() {
    let store = open_store();
    assert!(matches!(
        store.update(7, &make_rule("a")),
        Err(StoreError::NotFound(7))
    ));
    assert!(matches!(store.delete(7), Err(StoreError::NotFound(7))));
}

#[test]
fn delete_removes_document() {
    let store = open_store();
    let id = store.insert(&make_rule("a.b.c")).unwrap();
    store.delete(id).unwrap();
    assert!(store.get(id).unwrap().is_none());
}

#[test]
fn get_all_returns_every_rule_in_id_order() {
    let store = open_store();
    let first = store.insert(&make_rule("a")).unwrap();
    let second = store.insert(&make_rule("b")).unwrap();

    let rules = store.get_all().unwrap();
    assert_eq!(
        rules.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![first, second]
    );
}

#[test]
fn stored_documents_do_not_contain_the_id() {
    let store = open_store();
    let mut rule = make_rule("a.b.c");
    rule.id = 1234; // user-supplied ids are ignored
    let id = store.insert(&rule).unwrap();
    assert_ne!(id, 1234);

    let loaded = store.get(id).unwrap().expect("rule should exist");
    assert_eq!(loaded.id, id);
}

#[test]
fn closed_store_rejects_queries() {
    let store = open_store();
    store.close();
    assert!(matches!(store.get_all(), Err(StoreError::Closed)));
    assert!(matches!(
        store.insert(&make_rule("a")),
        Err(StoreError::Closed)
    ));
    store.close(); // idempotent
}

#[test]
fn survives_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.db");

    let id = {
        let store = SqliteRuleStore::open(&path, "rules").unwrap();
        store.insert(&make_rule("a.b.c")).unwrap()
    };

    let store = SqliteRuleStore::open(&path, "rules").unwrap();
    let loaded = store.get(id).unwrap().expect("rule should survive reopen");
    assert_eq!(loaded.id, id);
}

#[test]
fn rejects_suspicious_collection_names() {
    for bad in ["", "rules; drop table x", "1rules", "ru-les"] {
        assert!(matches!(
            SqliteRuleStore::open_in_memory(bad),
            Err(StoreError::InvalidCollection(_))
        ));
    }
}
