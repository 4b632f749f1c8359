//! Integration tests for `tasktracker_stub`.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tasktracker_stub::client::{LocalClient, TrackerClient};
use tasktracker_stub::tools::TrackerTools;
use tasktracker_stub::tracker::{
    PageRequest, SqliteTrackerStore, TrackerStore, ROOT_FOLDER_CODE,
};
use tasktracker_stub::VERSION;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[test]
fn test_created_folder_appears_in_parent_tree() {
    let store = SqliteTrackerStore::in_memory().unwrap();
    let parent = store.create_folder("datasources", Some(ROOT_FOLDER_CODE)).unwrap();
    let child = store.create_folder("postgres datasource", Some(&parent.code)).unwrap();

    let tree = store.get_folder_tree(&parent.code).unwrap();
    assert!(tree.children.iter().any(|node| node.code() == child.code));
}

#[test]
fn test_unit_fields_round_trip() {
    let store = SqliteTrackerStore::in_memory().unwrap();
    let payload = object(json!({
        "name": "Alert rule using Prometheus query",
        "steps": ["Open panel", "Create alert rule"],
        "priority": {"level": 2},
    }));
    let unit = store.create_unit(payload.clone()).unwrap();
    assert_eq!(store.get_unit(&unit.code).unwrap().custom_fields(), payload);
}

#[tokio::test]
async fn test_copy_test_cases_between_folders() {
    let client = LocalClient::in_memory().unwrap();
    let tools = TrackerTools::new(Arc::new(client.clone()));

    for name in ["Connection", "Explore query"] {
        let payload = json!({"name": format!("Postgres {name}"), "steps": ["open", "verify"]});
        tools.create_test_case("postgres datasource", &payload.to_string()).await.unwrap();
    }

    let source: Vec<Value> =
        serde_json::from_str(&tools.get_test_cases("postgres datasource").await.unwrap()).unwrap();
    assert_eq!(source.len(), 2);

    for case in &source {
        let mut adapted = case.as_object().unwrap().clone();
        adapted.remove("id");
        let name = adapted["name"].as_str().unwrap().replace("Postgres", "Abyss");
        adapted.insert("name".into(), json!(name));
        tools
            .create_test_case("abyss datasource", &Value::Object(adapted).to_string())
            .await
            .unwrap();
    }

    let target = client.get_test_cases("abyss datasource").await.unwrap();
    let names: Vec<&str> = target.iter().map(|case| case.fields["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Abyss Connection", "Abyss Explore query"]);
    assert!(target.iter().all(|case| case.folder.as_deref() == Some("abyss datasource")));
    assert_eq!(client.get_test_cases("postgres datasource").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_json_does_not_create() {
    let client = LocalClient::in_memory().unwrap();
    let tools = TrackerTools::new(Arc::new(client.clone()));

    let message = tools.create_test_case("f", "not json").await.unwrap();
    assert!(message.starts_with("Invalid JSON"));
    assert!(client.get_test_cases("f").await.unwrap().is_empty());
}

#[test]
fn test_file_store_shared_between_handles() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("stub.db");

    let writer = SqliteTrackerStore::new(&path).unwrap();
    writer.create_unit(object(json!({"folder": "f"}))).unwrap();
    drop(writer);

    let reader = SqliteTrackerStore::new(&path).unwrap();
    assert_eq!(reader.list_units_in_folder("f").unwrap().len(), 1);
}

#[test]
fn test_two_pages_cover_whole_collection() {
    let store = SqliteTrackerStore::in_memory().unwrap();
    for i in 0..7 {
        store.create_unit(object(json!({"n": i}))).unwrap();
    }

    let first = store.list_units(PageRequest::new(0, 4)).unwrap();
    let second = store.list_units(PageRequest::new(1, 4)).unwrap();
    let full = store.list_units(PageRequest::new(0, 10)).unwrap();

    let joined: Vec<&str> =
        first.content.iter().chain(&second.content).map(|u| u.code.as_str()).collect();
    let all: Vec<&str> = full.content.iter().map(|u| u.code.as_str()).collect();
    assert_eq!(joined, all);
    assert!(first.has_next);
    assert!(!second.has_next);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Two consecutive pages of size n cover the same units as one page of size 2n,
    /// and the whole collection when it fits in those two pages.
    #[test]
    fn prop_consecutive_pages_concatenate(total in 0usize..40, n in 1usize..12) {
        let store = SqliteTrackerStore::in_memory().unwrap();
        for i in 0..total {
            store.create_unit(object(json!({"n": i}))).unwrap();
        }

        let first = store.list_units(PageRequest::new(0, n)).unwrap();
        let second = store.list_units(PageRequest::new(1, n)).unwrap();
        let both = store.list_units(PageRequest::new(0, 2 * n)).unwrap();

        let joined: Vec<String> =
            first.content.iter().chain(&second.content).map(|u| u.code.clone()).collect();
        let expected: Vec<String> = both.content.iter().map(|u| u.code.clone()).collect();
        prop_assert_eq!(&joined, &expected);

        if n < total && total <= 2 * n {
            let full = store.list_units(PageRequest::new(0, total)).unwrap();
            let all: Vec<String> = full.content.iter().map(|u| u.code.clone()).collect();
            prop_assert_eq!(&joined, &all);
            prop_assert!(!full.has_next);
        }

        prop_assert_eq!(first.total_elements, total);
        prop_assert_eq!(first.has_next, n < total);
        prop_assert_eq!(second.has_next, 2 * n < total);
    }
}
