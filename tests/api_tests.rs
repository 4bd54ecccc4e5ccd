//! API integration tests, run in-process against the in-memory backend

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use circulation_server::{api, config::AppConfig, repository::Repository, AppState};

const ISBN: &str = "978-2-07-036822-8";

fn app() -> Router {
    let state = AppState::new(AppConfig::default(), Repository::in_memory());
    api::create_router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request"),
        None => builder.body(Body::empty()).expect("Failed to build request"),
    };

    let response = app.clone().oneshot(request).await.expect("Failed to send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, value)
}

/// Register a user and log in; returns (token, user id)
async fn sign_up(app: &Router, username: &str, role: &str) -> (String, i64) {
    let (status, _) = send(
        app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "username": username, "password": "secret", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "username": username, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["token"].as_str().expect("No token in response").to_string(),
        body["user"]["id"].as_i64().expect("No user ID"),
    )
}

async fn add_book(app: &Router, admin: &str, isbn: &str, capacity: i64) {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(admin),
        Some(json!({ "isbn": isbn, "title": "Le Petit Prince", "capacity": capacity })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

async fn borrow(app: &Router, token: &str, isbn: &str) -> (StatusCode, Value) {
    send(app, "POST", "/users/borrow", Some(token), Some(json!({ "isbn": isbn }))).await
}

async fn give_back(app: &Router, token: &str, isbn: &str) -> (StatusCode, Value) {
    send(app, "POST", "/users/return", Some(token), Some(json!({ "isbn": isbn }))).await
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_login_profile() {
    let app = app();
    let (token, id) = sign_up(&app, "alice", "user").await;

    let (status, body) = send(&app, "GET", "/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("password").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "username": "alice", "password": "secret", "role": "user" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = app();
    sign_up(&app, "alice", "user").await;

    let (status, _) = send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_access() {
    let app = app();
    let (status, body) = send(&app, "POST", "/users/borrow", None, Some(json!({ "isbn": ISBN }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, _) = send(&app, "GET", "/books", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_requests_get_error_body() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/users/register",
        None,
        Some(json!({ "username": "alice", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["code"], 6);
    assert!(body["message"].as_str().is_some_and(|m| m.contains("role")));

    let (token, _) = sign_up(&app, "bob", "user").await;
    let (status, body) = send(&app, "POST", "/users/borrow", Some(&token), Some(json!({ "isbn": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, body) = send(&app, "GET", "/users/not-a-number/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_lending_scenario_capacity_two() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    let (a, _) = sign_up(&app, "reader-a", "user").await;
    let (b, _) = sign_up(&app, "reader-b", "user").await;
    let (c, _) = sign_up(&app, "reader-c", "user").await;
    add_book(&app, &admin, ISBN, 2).await;

    let (status, body) = borrow(&app, &a, ISBN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available_quantity"], 1);

    let (status, body) = borrow(&app, &b, ISBN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available_quantity"], 0);

    let (status, body) = borrow(&app, &c, ISBN).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CapacityExceeded");

    let (_, body) = send(&app, "GET", &format!("/books/{}/availability", ISBN), Some(&c), None).await;
    assert_eq!(body["available_quantity"], 0);

    let (status, body) = give_back(&app, &a, ISBN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available_quantity"], 1);

    let (status, body) = borrow(&app, &c, ISBN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["available_quantity"], 0);
    assert_eq!(body["book"]["holders"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_book_changes_nothing() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    add_book(&app, &admin, ISBN, 1).await;

    let (status, body) = borrow(&app, &admin, "no-such-book").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ResourceNotFound");

    let (_, body) = send(&app, "GET", "/books", Some(&admin), None).await;
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["available_quantity"], 1);

    let (status, _) = send(&app, "GET", "/books/no-such-book", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_double_borrow_and_stray_return() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    let (a, _) = sign_up(&app, "reader-a", "user").await;
    add_book(&app, &admin, ISBN, 3).await;

    assert_eq!(borrow(&app, &a, ISBN).await.0, StatusCode::OK);
    let (status, body) = borrow(&app, &a, ISBN).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyHeld");

    let (status, body) = give_back(&app, &admin, ISBN).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NotHeld");

    let (_, body) = send(&app, "GET", &format!("/books/{}", ISBN), Some(&a), None).await;
    assert_eq!(body["holders"].as_array().unwrap().len(), 1);
    assert_eq!(body["available_quantity"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_over_http() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    add_book(&app, &admin, ISBN, 1).await;

    let mut tokens = Vec::new();
    for i in 0..6 {
        tokens.push(sign_up(&app, &format!("reader-{}", i), "user").await.0);
    }

    let handles: Vec<_> = tokens
        .iter()
        .cloned()
        .map(|token| {
            let app = app.clone();
            tokio::spawn(async move { borrow(&app, &token, ISBN).await })
        })
        .collect();

    let mut ok = 0;
    let mut exceeded = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        match status {
            StatusCode::OK => ok += 1,
            StatusCode::CONFLICT => {
                assert_eq!(body["error"], "CapacityExceeded");
                exceeded += 1;
            }
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(exceeded, tokens.len() - 1);
}

#[tokio::test]
async fn test_admin_only_catalog_changes() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    let (reader, _) = sign_up(&app, "reader", "user").await;

    let (status, _) = send(
        &app,
        "POST",
        "/books",
        Some(&reader),
        Some(json!({ "isbn": ISBN, "capacity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "capacity": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    add_book(&app, &admin, ISBN, 2).await;
    let (status, body) = send(
        &app,
        "POST",
        "/books",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "capacity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Duplicate");

    let (status, _) = send(&app, "GET", "/users", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "GET", "/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resize_never_evicts() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    let (a, _) = sign_up(&app, "reader-a", "user").await;
    let (b, _) = sign_up(&app, "reader-b", "user").await;
    add_book(&app, &admin, ISBN, 3).await;
    borrow(&app, &a, ISBN).await;
    borrow(&app, &b, ISBN).await;

    let uri = format!("/books/{}/capacity", ISBN);
    let (status, body) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "capacity": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CapacityBelowHolders");

    let (status, body) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "capacity": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["capacity"], 5);
    assert_eq!(body["available_quantity"], 3);

    let (status, _) = send(&app, "PUT", &uri, Some(&a), Some(json!({ "capacity": 9 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_holdings_views() {
    let app = app();
    let (admin, admin_id) = sign_up(&app, "admin", "admin").await;
    let (a, a_id) = sign_up(&app, "reader-a", "user").await;
    add_book(&app, &admin, ISBN, 1).await;
    add_book(&app, &admin, "978-0441013593", 1).await;
    borrow(&app, &a, ISBN).await;

    let (status, body) = send(&app, "GET", "/users/borrowed-books", Some(&a), None).await;
    assert_eq!(status, StatusCode::OK);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], ISBN);

    let (status, body) = send(&app, "GET", &format!("/users/{}/books", a_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", &format!("/users/{}/books", admin_id), Some(&a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/users/999/books", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SubjectNotFound");
}

#[tokio::test]
async fn test_acting_for_another_user() {
    let app = app();
    let (admin, _) = sign_up(&app, "admin", "admin").await;
    let (a, a_id) = sign_up(&app, "reader-a", "user").await;
    let (b, b_id) = sign_up(&app, "reader-b", "user").await;
    add_book(&app, &admin, ISBN, 2).await;

    let (status, _) = send(
        &app,
        "POST",
        "/users/borrow",
        Some(&a),
        Some(json!({ "isbn": ISBN, "user_id": b_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        "/users/borrow",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "user_id": a_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["holders"], json!([a_id]));

    let (status, body) = send(
        &app,
        "POST",
        "/users/borrow",
        Some(&admin),
        Some(json!({ "isbn": ISBN, "user_id": 4242 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SubjectNotFound");

    let (status, _) = give_back(&app, &a, ISBN).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/users/borrowed-books", Some(&b), None).await;
    assert!(body["books"].as_array().unwrap().is_empty());
}
