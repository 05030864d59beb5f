//! End-to-end tests for the task CRUD HTTP surface.
//! Spins up the REST server on a random port and exercises it with reqwest.

use serde_json::{json, Value};
use std::sync::Arc;
use taskd::{config::ServerConfig, rest, storage::Storage, AppContext};
use tempfile::TempDir;

/// Find a free local port by binding to port 0.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start the server against a fresh temp data dir; returns the base URL.
async fn spawn_server(dir: &TempDir) -> String {
    let port = find_free_port();
    let data_dir = dir.path().to_path_buf();
    let config = Arc::new(ServerConfig::new(
        Some(port),
        Some(data_dir.clone()),
        Some("error".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(&data_dir).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    tokio::spawn(async move {
        let _ = rest::start_rest_server(ctx).await;
    });

    // Give the server a moment to start
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    format!("http://127.0.0.1:{port}")
}

async fn create_task(client: &reqwest::Client, base: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{base}/tasks/"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_returns_envelope_with_defaults() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = create_task(&client, &base, json!({ "title": "Buy milk" })).await;
    assert_eq!(res.status(), 200);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "task created successfully");
    assert_eq!(body["data"]["title"], "Buy milk");
    assert_eq!(body["data"]["completed"], false);
    assert_eq!(body["data"]["description"], Value::Null);
    assert!(body["data"]["id"].is_number(), "id is system-generated");
    assert!(
        body["data"]["created_at"].is_string(),
        "created_at is set at creation"
    );
}

#[tokio::test]
async fn test_create_without_title_is_rejected() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = create_task(&client, &base, json!({ "description": "no title" })).await;
    assert_eq!(res.status(), 422);

    // Nothing was persisted.
    let list: Value = client
        .get(format!("{base}/tasks/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_rejects_overlong_fields() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = create_task(&client, &base, json!({ "title": "x".repeat(101) })).await;
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"][0]["loc"][1], "title");

    let res = create_task(
        &client,
        &base,
        json!({ "title": "ok", "description": "y".repeat(501) }),
    )
    .await;
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"][0]["loc"][1], "description");
}

#[tokio::test]
async fn test_list_contains_created_task() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let created: Value = create_task(&client, &base, json!({ "title": "only one" }))
        .await
        .json()
        .await
        .unwrap();

    let list: Value = client
        .get(format!("{base}/tasks/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["ok"], true);
    assert_eq!(list["message"], "tasks retrieved successfully");
    let tasks = list["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], created["data"]["id"]);
    assert_eq!(tasks[0]["title"], "only one");
}

#[tokio::test]
async fn test_list_skip_and_limit() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    for i in 0..5 {
        create_task(&client, &base, json!({ "title": format!("task {i}") })).await;
    }

    let page: Value = client
        .get(format!("{base}/tasks/?skip=2&limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let tasks = page["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["title"], "task 2");
    assert_eq!(tasks[1]["title"], "task 3");
}

#[tokio::test]
async fn test_get_missing_task_is_404() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/tasks/99999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Task not found");
}

#[tokio::test]
async fn test_update_only_completed_leaves_other_fields() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let created: Value = create_task(
        &client,
        &base,
        json!({ "title": "Original", "description": "keep me" }),
    )
    .await
    .json()
    .await
    .unwrap();
    let id = created["data"]["id"].as_i64().unwrap();

    let res = client
        .put(format!("{base}/tasks/{id}"))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "task updated successfully");
    assert_eq!(body["data"]["title"], "Original");
    assert_eq!(body["data"]["description"], "keep me");
    assert_eq!(body["data"]["completed"], true);
}

#[tokio::test]
async fn test_update_missing_task_is_404() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{base}/tasks/424242"))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Task not found");
}

#[tokio::test]
async fn test_delete_then_get_and_repeat_delete() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let created: Value = create_task(&client, &base, json!({ "title": "doomed" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_i64().unwrap();

    let res = client
        .delete(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "task deleted successfully");
    assert_eq!(body["data"], json!({ "id": id }), "delete returns only the id");

    // Subsequent fetch misses.
    let res = client
        .get(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Delete is not idempotent — the second call fails too.
    let res = client
        .delete(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Task not found");
}

#[tokio::test]
async fn test_ids_increase_monotonically() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let mut prev = 0i64;
    for i in 0..3 {
        let body: Value = create_task(&client, &base, json!({ "title": format!("t{i}") }))
            .await
            .json()
            .await
            .unwrap();
        let id = body["data"]["id"].as_i64().unwrap();
        assert!(id > prev, "ids must increase within one storage instance");
        prev = id;
    }
}

#[tokio::test]
async fn test_health_reports_ok() {
    let dir = TempDir::new().unwrap();
    let base = spawn_server(&dir).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_secs"].is_number());
}
