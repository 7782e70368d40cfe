//! HTTP API tests
//!
//! Exercises the axum router in-process with `oneshot` requests: actor
//! resolution, status codes for gated mutations and the JSON error body.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use nexus::api::{router, ACTOR_HEADER};
use nexus::{MemoryStore, ServiceSettings, Store, TravelerService};

fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let service = Arc::new(TravelerService::new(store, ServiceSettings::default()));
    router(service, 1024 * 1024)
}

async fn send(app: &Router, method: &str, uri: &str, actor: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Bootstraps an admin, then a supervisor approver and an operator.
async fn staffed_app() -> Router {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "username": "admin", "role": "ADMIN" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for (username, role, approver) in [("kwong", "SUPERVISOR", true), ("dortiz", "OPERATOR", false)] {
        let (status, _) = send(
            &app,
            "POST",
            "/users/",
            Some("admin"),
            Some(json!({ "username": username, "role": role, "isApprover": approver })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app
}

fn cable_traveler() -> Value {
    json!({
        "jobNumber": "8414",
        "travelerType": "CABLE",
        "partNumber": "WH-220",
        "revision": "C",
        "quantity": 10
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn traveler_types_are_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/travelers/types/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some_and(|types| !types.is_empty()));
}

#[tokio::test]
async fn missing_actor_is_unauthenticated() {
    let app = staffed_app().await;
    let (status, body) = send(&app, "GET", "/travelers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert!(body["message"].is_string());

    let (status, _) = send(&app, "GET", "/travelers", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_user_needs_admin() {
    let app = staffed_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some("dortiz"),
        Some(json!({ "username": "eve", "role": "ADMIN" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, "GET", "/auth/me", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "kwong");
}

#[tokio::test]
async fn create_then_operator_completion_is_accepted_for_approval() {
    let app = staffed_app().await;
    let (status, traveler) = send(&app, "POST", "/travelers", Some("dortiz"), Some(cable_traveler())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(traveler["id"], 1);
    assert_eq!(traveler["status"], "CREATED");
    assert_eq!(traveler["steps"].as_array().map(Vec::len), Some(3));

    let (status, approval) = send(
        &app,
        "POST",
        "/travelers/1/complete",
        Some("dortiz"),
        Some(json!({ "details": "Rush order" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(approval["status"], "PENDING");

    let (status, pending) = send(&app, "GET", "/approvals", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().map(Vec::len), Some(1));

    let approval_id = approval["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/approvals/{approval_id}/approve"),
        Some("kwong"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, traveler) = send(&app, "GET", "/travelers/1", Some("dortiz"), None).await;
    assert_eq!(traveler["status"], "COMPLETED");
}

#[tokio::test]
async fn invalid_outcome_is_bad_request() {
    let app = staffed_app().await;
    let (_, traveler) = send(&app, "POST", "/travelers", Some("dortiz"), Some(cable_traveler())).await;
    let step_id = traveler["steps"][0]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/travelers/1/steps/{step_id}/outcome"),
        Some("dortiz"),
        Some(json!({ "accepted": 8, "rejected": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OUTCOME");
}

#[tokio::test]
async fn second_timer_conflicts() {
    let app = staffed_app().await;
    send(&app, "POST", "/travelers", Some("dortiz"), Some(cable_traveler())).await;

    let start = json!({ "travelerId": 1, "description": "Crimp" });
    let (status, entry) = send(&app, "POST", "/labor", Some("dortiz"), Some(start.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/labor/", Some("dortiz"), Some(start)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TIMER_ALREADY_ACTIVE");

    let entry_id = entry["id"].as_str().unwrap();
    let (status, stopped) = send(
        &app,
        "POST",
        &format!("/labor/{entry_id}/stop"),
        Some("dortiz"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["isCompleted"], true);
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("x-correlation-id", "scan-station-7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "scan-station-7"
    );
}

#[tokio::test]
async fn unknown_traveler_is_not_found() {
    let app = staffed_app().await;
    let (status, body) = send(&app, "GET", "/travelers/99", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_input_uses_error_body() {
    let app = staffed_app().await;

    let mut negative = cable_traveler();
    negative["quantity"] = json!(-5);
    let (status, body) = send(&app, "POST", "/travelers", Some("kwong"), Some(negative)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(body["message"].as_str().unwrap().starts_with("body:"));

    let (status, body) = send(&app, "GET", "/travelers/abc", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["message"], "path: contains a malformed identifier");

    let (status, body) = send(&app, "GET", "/labor/my-entries?days=soon", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let request = Request::builder()
        .method("POST")
        .uri("/travelers")
        .header(ACTOR_HEADER, "kwong")
        .header("content-type", "application/json")
        .body(Body::from("{\"jobNumber\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_my_entries_window_is_rejected() {
    let app = staffed_app().await;
    let (status, body) = send(
        &app,
        "GET",
        "/labor/my-entries?days=9223372036854775807",
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    // The server is still answering
    let (status, _) = send(&app, "GET", "/labor/my-entries?days=3", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bom_lines_are_added_and_listed() {
    let app = staffed_app().await;
    send(&app, "POST", "/travelers", Some("dortiz"), Some(cable_traveler())).await;

    let (status, item) = send(
        &app,
        "POST",
        "/travelers/1/bom",
        Some("dortiz"),
        Some(json!({
            "partNumber": "CONN-D38999",
            "description": "Circular connector",
            "quantity": 2,
            "unitPrice": 48.5,
            "expectedVersion": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["partNumber"], "CONN-D38999");
    assert_eq!(item["quantity"], 2);

    let (status, body) = send(
        &app,
        "POST",
        "/travelers/1/bom",
        Some("dortiz"),
        Some(json!({ "partNumber": "", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (status, lines) = send(&app, "GET", "/travelers/1/bom", Some("kwong"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lines.as_array().map(Vec::len), Some(1));
    assert_eq!(lines[0]["id"], item["id"]);
}
