//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storage_cache::api::create_router;
use storage_cache::cache::SyncParams;
use storage_cache::{AppState, MemoryEngine, Storage, StorageConfig, StorageEngine};
use tower::ServiceExt;

// == Helper Functions ==

fn test_config() -> StorageConfig {
    StorageConfig {
        is_enable_auto_clear: false,
        ..StorageConfig::default()
    }
}

fn create_test_app() -> Router {
    let storage = Storage::new(test_config(), StorageEngine::hybrid(MemoryEngine::new()));
    create_router(AppState::new(storage))
}

/// App with a fetcher registered for `user` that echoes its parameters.
fn create_fetching_app() -> Router {
    let storage = Storage::builder()
        .config(test_config())
        .engine(StorageEngine::hybrid(MemoryEngine::new()))
        .sync_fn("user", |params: SyncParams, _options: Vec<Value>| async move {
            Ok::<_, anyhow::Error>(json!({ "code": 0, "data": params }))
        })
        .build();
    create_router(AppState::new(storage))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Save Endpoint Tests ==

#[tokio::test]
async fn test_save_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/items",
            json!({"key": "test_key", "data": {"v": 1}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "test_key");
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_save_endpoint_conflicting_expiry() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/items",
            json!({"key": "k", "data": 1, "expires": 5, "neverExpire": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Load Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_after_save() {
    let app = create_test_app();

    let save = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/items",
            json!({"key": "get_key", "data": "get_value"}),
        ))
        .await
        .unwrap();
    assert_eq!(save.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/items/get_key"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, json!({"key": "get_key", "data": "get_value"}));
}

#[tokio::test]
async fn test_get_endpoint_without_fetcher() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/items/nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_load_endpoint_fetches_and_caches() {
    let app = create_fetching_app();
    let body = json!({"key": "user", "syncParams": {"id": 7}});

    let first = app
        .clone()
        .oneshot(json_request("POST", "/load", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_to_json(first.into_body()).await;
    assert_eq!(first["data"], json!({"code": 0, "data": {"id": 7}}));

    let info = app
        .oneshot(empty_request("GET", "/info"))
        .await
        .unwrap();
    let info = body_to_json(info.into_body()).await;
    assert_eq!(info["engine"], "mini_program_like");
    assert_eq!(info["in_flight"], 0);
    assert_eq!(info["keys"], json!(["STORAGE_CACHE: user?id=7"]));
}

#[tokio::test]
async fn test_load_endpoint_empty_key() {
    let app = create_fetching_app();

    let response = app
        .oneshot(json_request("POST", "/load", json!({"key": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Remove Endpoint Tests ==

#[tokio::test]
async fn test_remove_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request("PUT", "/items", json!({"key": "gone", "data": 1})))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/items/gone"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("GET", "/items/gone"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Clear / Info / Sweep Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint_with_whitelist() {
    let app = create_test_app();

    for key in ["a1", "a2", "b1"] {
        app.clone()
            .oneshot(json_request("PUT", "/items", json!({"key": key, "data": key})))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(json_request("POST", "/clear", json!({"whiteList": ["a"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let info = app.oneshot(empty_request("GET", "/info")).await.unwrap();
    let info = body_to_json(info.into_body()).await;
    let mut keys: Vec<String> = serde_json::from_value(info["keys"].clone()).unwrap();
    keys.sort();

    assert_eq!(keys, vec!["STORAGE_CACHE: a1", "STORAGE_CACHE: a2"]);
}

#[tokio::test]
async fn test_sweep_endpoint() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/items",
            json!({"key": "short", "data": 1, "expires": 1}),
        ))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = app
        .oneshot(empty_request("POST", "/sweep"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_to_json(response.into_body()).await;
    assert_eq!(report["memory_removed"], 1);
    assert_eq!(report["backend_removed"], 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/items")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Live Server Test ==

#[tokio::test]
async fn test_live_server_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_fetching_app();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{}", addr);

    let saved = client
        .put(format!("{}/items", base))
        .json(&json!({"key": "live", "data": [1, 2, 3]}))
        .send()
        .await
        .unwrap();
    assert_eq!(saved.status(), reqwest::StatusCode::OK);

    let loaded: Value = client
        .get(format!("{}/items/live", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loaded["data"], json!([1, 2, 3]));

    let fetched: Value = client
        .post(format!("{}/load", base))
        .json(&json!({"key": "user", "syncParams": {"id": "x"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["data"]["data"], json!({"id": "x"}));

    server.abort();
}
