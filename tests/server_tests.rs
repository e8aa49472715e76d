use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use port_probe::server::{router, AppState};
use port_probe::Prober;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState {
        prober: Prober::default(),
        default_timeout: Duration::from_millis(2000),
    };
    router(state, None)
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_port_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (status, body) =
        post_json("/api/test-port", json!({ "host": "127.0.0.1", "port": port, "timeout": 2000 }))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "open");
    assert_eq!(body["protocol"], "TCP");
    assert_eq!(body["port"], port);
    assert!(body["responseTime"].as_u64().is_some());
    assert!(body["timestamp"].is_string());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_port_missing_fields() {
    let (status, body) = post_json("/api/test-port", json!({ "host": "127.0.0.1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = post_json("/api/test-port", json!({ "port": 80 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_port_out_of_range() {
    let (status, body) =
        post_json("/api/test-port", json!({ "host": "127.0.0.1", "port": 70000 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("70000"));

    let (status, _) = post_json(
        "/api/test-port",
        json!({ "host": "127.0.0.1", "port": 80, "timeout": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ports_keeps_input_order() {
    let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let pa = a.local_addr().unwrap().port();
    let pb = b.local_addr().unwrap().port();

    let (status, body) = post_json(
        "/api/test-ports",
        json!({ "host": "127.0.0.1", "ports": [pb, pa], "timeout": 2000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let arr = body.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["port"], pb);
    assert_eq!(arr[1]["port"], pa);
    assert!(arr.iter().all(|r| r["status"] == "open"));
}

#[tokio::test]
async fn test_ports_rejects_non_array_and_oversized() {
    let (status, _) =
        post_json("/api/test-ports", json!({ "host": "127.0.0.1", "ports": 80 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ports: Vec<u16> = (1..=101).collect();
    let (status, body) =
        post_json("/api/test-ports", json!({ "host": "127.0.0.1", "ports": ports })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("100"));

    let (status, _) = post_json("/api/test-ports", json!({ "ports": [80] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ports_empty_list_still_checks_host() {
    let (status, body) =
        post_json("/api/test-ports", json!({ "host": "bad host", "ports": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("bad host"));

    let (status, _) = post_json(
        "/api/test-ports",
        json!({ "host": "127.0.0.1", "ports": [], "timeout": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        post_json("/api/test-ports", json!({ "host": "127.0.0.1", "ports": [] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/test-port")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn common_ports_listed() {
    let req = Request::builder()
        .uri("/api/common-ports")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let list = body.as_array().unwrap();
    assert!(list.iter().any(|p| p["port"] == 22 && p["service"] == "SSH"));
}
