mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{catalog, counter, counter_id, id, online, service};
use office_queue_back::{routes, state::AppState};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> Router {
    let catalog = catalog(
        vec![service("A", 300), service("B", 600)],
        vec![counter("Desk", &["A", "B"])],
    );
    let (state, _store) = online(&catalog).await;
    routes::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn issue_then_call_next() {
    let app = app().await;

    let (status, ticket) = send(
        &app,
        post_json("/api/v1/tickets/new", json!({ "serviceTypeId": id("A") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["ticketCode"], "A0");
    assert_eq!(ticket["serviceId"], id("A").to_string());
    assert!(ticket["issuedAt"].as_str().unwrap().contains('T'));

    let (status, queue) = send(&app, get(&format!("/api/v1/services/{}/queue", id("A")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["length"], 1);

    let (status, served) = send(
        &app,
        post(&format!("/api/v1/counters/{}/next", counter_id("Desk"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served["ticketId"], ticket["ticketId"]);

    let (status, fetched) = send(
        &app,
        get(&format!("/api/v1/tickets/{}", ticket["ticketId"].as_str().unwrap())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["ticketCode"], "A0");
}

#[tokio::test]
async fn empty_counter_answers_conflict() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post(&format!("/api/v1/counters/{}/next", counter_id("Desk"))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "no_tickets");

    let (status, body) = send(
        &app,
        post(&format!("/api/v1/counters/{}/next", Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn malformed_service_id_is_rejected() {
    let app = app().await;

    let (status, body) = send(
        &app,
        post_json("/api/v1/tickets/new", json!({ "serviceTypeId": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = send(&app, post_json("/api/v1/tickets/new", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/api/v1/tickets/new", json!({ "serviceTypeId": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_is_listed() {
    let app = app().await;

    let (status, services) = send(&app, get("/api/v1/services")).await;
    assert_eq!(status, StatusCode::OK);
    let tags: Vec<_> = services
        .as_array()
        .unwrap()
        .iter()
        .map(|service| service["tagName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(tags, vec!["A", "B"]);

    let (status, service) = send(&app, get(&format!("/api/v1/services/{}", id("B")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(service["averageServiceTime"], 600);

    let (status, _) = send(&app, get(&format!("/api/v1/services/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn degraded_backend_reports_unavailable() {
    let app = routes::router(AppState::new());

    let (status, health) = send(&app, get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    let (status, body) = send(
        &app,
        post_json("/api/v1/tickets/new", json!({ "serviceTypeId": id("A") })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "unavailable");
}

#[tokio::test]
async fn healthy_backend_reports_ok() {
    let app = app().await;

    let (status, health) = send(&app, get("/healthcheck")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["pendingRecords"], 0);
}
