use pretty_assertions::assert_eq;
use punchlist_core::model::{Category, NewTask, Priority, TaskPatch};
use punchlist_core::{RemoteStore, StoreError, TaskStore};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE: &str = "/rest/v1/todos";

fn row(id: &str, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "text": text,
        "completed": false,
        "category": "general",
        "date": null,
        "priority": "medium",
        "order": 2,
        "created_at": "2025-01-15T09:00:00+00:00",
        "updated_at": "2025-01-15T09:00:00+00:00"
    })
}

async fn setup() -> (MockServer, RemoteStore) {
    let server = MockServer::start().await;
    let store = RemoteStore::new(&server.uri(), "anon-key").expect("client");
    (server, store)
}

#[tokio::test]
async fn list_sends_key_headers_and_maps_rows() {
    let (server, store) = setup().await;
    let mut legacy = row("b", "Legacy");
    legacy["priority"] = json!(null);
    legacy["order"] = json!(null);

    Mock::given(method("GET"))
        .and(path(TABLE))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("a", "Water plants"), legacy])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = store.list_all().await.expect("list");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].priority, Some(Priority::Medium));
    assert_eq!(tasks[0].order, Some(2));
    assert_eq!(tasks[1].priority, Some(Priority::Low));
    assert_eq!(tasks[1].order, Some(0));
}

#[tokio::test]
async fn create_posts_row_and_returns_representation() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(TABLE))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("a", "Water plants")])))
        .expect(1)
        .mount(&server)
        .await;

    let created = store
        .create(NewTask {
            text: "Water plants".into(),
            completed: false,
            category: Category::General,
            date: None,
            priority: Priority::Medium,
            order: 0,
        })
        .await
        .expect("create");
    assert_eq!(created.id, "a");
}

#[tokio::test]
async fn update_filters_by_id_and_sends_patch() {
    let (server, store) = setup().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE))
        .and(query_param("id", "eq.a"))
        .and(body_partial_json(json!({ "order": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("a", "Water plants")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE))
        .and(query_param("id", "eq.gone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let updated = store.update("a", TaskPatch::order(5)).await.expect("update");
    assert_eq!(updated.map(|task| task.id), Some("a".to_string()));
    assert_eq!(store.update("gone", TaskPatch::order(1)).await.expect("update"), None);
}

#[tokio::test]
async fn server_errors_surface_on_update() {
    let (server, store) = setup().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let err = store
        .update("a", TaskPatch::completed(true))
        .await
        .expect_err("update fails");
    assert!(matches!(err, StoreError::Remote { status: 503, .. }));
}

#[tokio::test]
async fn delete_reports_missing_rows_and_failures_as_false() {
    let (server, store) = setup().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE))
        .and(query_param("id", "eq.a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("a", "Water plants")])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE))
        .and(query_param("id", "eq.b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE))
        .and(query_param("id", "eq.c"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .mount(&server)
        .await;

    assert!(store.delete("a").await.expect("delete"));
    assert!(!store.delete("b").await.expect("delete"));
    assert!(!store.delete("c").await.expect("delete"));
}

#[tokio::test]
async fn delete_all_uses_a_filter_matching_every_row() {
    let (server, store) = setup().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE))
        .and(query_param("id", "neq.00000000-0000-0000-0000-000000000000"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store.delete_all().await.expect("delete all"));
}
