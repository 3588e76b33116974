use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use rust_accounts::account::InMemoryAccountStore;
use rust_accounts::api::{router, AppState};
use rust_accounts::attachment::InMemoryAttachmentStore;
use rust_accounts::config::AppConfig;
use rust_accounts::events::{LifecycleEvent, RecordingPublisher};

const BOUNDARY: &str = "accounts-test-boundary";

struct TestApp {
    app: Router,
    events: Arc<RecordingPublisher>,
}

fn test_app() -> TestApp {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 30;

    let events = Arc::new(RecordingPublisher::new());
    let state = AppState::new(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryAttachmentStore::new()),
        events.clone(),
        &config,
    );
    TestApp {
        app: router(state, config.server.max_upload_bytes),
        events,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let (status, bytes) = send(app, request.body(Body::from(body.to_string())).unwrap()).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn upload_request(owner: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(format!("/public/api/files/{}", owner))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn register(app: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
    send_json(
        app,
        Method::POST,
        "/public/api/users",
        json!({"name": name, "email": email, "password": password}),
        None,
    )
    .await
}

async fn account_id(app: &Router, email: &str) -> u64 {
    let (_, users) = get_json(app, "/public/api/users").await;
    users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == email)
        .and_then(|u| u["id"].as_u64())
        .unwrap()
}

#[tokio::test]
async fn test_register_login_upload_download() {
    let TestApp { app, events } = test_app();

    let (status, tokens) = register(&app, "Ann", "ann@x.com", "pw").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!tokens["accessToken"].as_str().unwrap().is_empty());
    assert!(!tokens["refreshToken"].as_str().unwrap().is_empty());
    assert_eq!(
        events.events(),
        vec![LifecycleEvent::AccountCreated {
            email: "ann@x.com".into(),
            name: "Ann".into()
        }]
    );

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/public/api/users/login",
        json!({"email": "ann@x.com", "password": "wrong"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, tokens) = send_json(
        &app,
        Method::POST,
        "/public/api/users/login",
        json!({"email": "ann@x.com", "password": "pw"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!tokens["accessToken"].as_str().unwrap().is_empty());
    assert!(!tokens["refreshToken"].as_str().unwrap().is_empty());

    let ann = account_id(&app, "ann@x.com").await;
    let payload = b"hello from ann\x00\xff";
    let (status, bytes) = send(&app, upload_request(&ann.to_string(), "notes.txt", "text/plain", payload)).await;
    assert_eq!(status, StatusCode::OK);
    let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
    let file_id = uploaded["id"].as_str().unwrap().to_string();
    assert_eq!(file_id.len(), 24);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/public/api/files/{}", file_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\""
    );
    let downloaded = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&downloaded[..], &payload[..]);

    let (status, listed) = get_json(&app, &format!("/public/api/files/user/{}", ann)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([{"id": file_id, "filename": "notes.txt"}]));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_without_event() {
    let TestApp { app, events } = test_app();

    assert_eq!(register(&app, "Ann", "ann@x.com", "pw").await.0, StatusCode::OK);
    let (status, body) = register(&app, "Other", "ann@x.com", "pw2").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMAIL_ALREADY_EXISTS");
    assert!(body.get("accessToken").is_none());
    assert_eq!(events.events().len(), 1);
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let TestApp { app, events } = test_app();

    let (status, body) = register(&app, "Ann", "not-an-email", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/public/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_upload_for_unknown_account() {
    let TestApp { app, .. } = test_app();

    let (status, bytes) = send(&app, upload_request("999", "a.txt", "text/plain", b"a")).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");

    let (status, listed) = get_json(&app, "/public/api/files/user/999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_missing_attachment_is_not_found() {
    let TestApp { app, .. } = test_app();

    let (status, _) = get_json(&app, "/public/api/files/65a1b2c3d4e5f60718293a4b").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&app, "/public/api/files/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_twice() {
    let TestApp { app, .. } = test_app();
    register(&app, "Ann", "ann@x.com", "pw").await;
    let ann = account_id(&app, "ann@x.com").await;
    send(&app, upload_request(&ann.to_string(), "a.txt", "text/plain", b"a")).await;

    for _ in 0..2 {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/public/api/files/user/{}", ann))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = get_json(&app, &format!("/public/api/files/user/{}", ann)).await;
        assert_eq!(listed, json!([]));
    }
}

#[tokio::test]
async fn test_private_routes_require_bearer() {
    let TestApp { app, events } = test_app();
    let (_, tokens) = register(&app, "Ann", "ann@x.com", "pw").await;
    let access = tokens["accessToken"].as_str().unwrap().to_string();
    let refresh = tokens["refreshToken"].as_str().unwrap().to_string();
    let ann = account_id(&app, "ann@x.com").await;
    let update = json!({"id": ann, "name": "Ann B", "email": "annb@x.com"});

    let (status, body) = send_json(&app, Method::PUT, "/private/api/users", update.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send_json(&app, Method::PUT, "/private/api/users", update.clone(), Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(&app, Method::PUT, "/private/api/users", update, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, users) = get_json(&app, "/public/api/users").await;
    assert_eq!(users, json!([{"id": ann, "name": "Ann B", "email": "annb@x.com"}]));

    let uri = format!("/private/api/users/{}", ann);
    let (status, _) = send_json(&app, Method::DELETE, &uri, Value::Null, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_json(&app, Method::DELETE, &uri, Value::Null, Some(&access)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ACCOUNT_NOT_FOUND");

    let kinds: Vec<&str> = events.events().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["AccountCreated", "AccountUpdated", "AccountDeleted"]);
}
