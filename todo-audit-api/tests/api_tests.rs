// Copyright 2025 Todo Audit Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP tests driving the router over in-memory stores.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use todo_audit_api::app;
use todo_audit_api::state::AppState;
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

async fn create(app: &Router, uid: &str, title: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/todos",
        Some(json!({ "uid": uid, "title": title, "content": "content" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health() {
    let app = app(AppState::in_memory());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn test_metrics_disabled_is_not_found() {
    let app = app(AppState::in_memory());
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_returns_pristine_todo() {
    let app = app(AppState::in_memory());

    let todo = create(&app, "u1", "Groceries").await;

    assert_eq!(todo["uid"], "u1");
    assert_eq!(todo["completed"], false);
    assert_eq!(todo["createdAt"], todo["updatedAt"]);
    assert_eq!(todo["id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn test_todo_lifecycle_leaves_history() {
    let app = app(AppState::in_memory());
    let todo = create(&app, "u1", "A").await;
    let id = todo["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/todos/{id}"),
        Some(json!({ "title": "B", "content": "content", "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "B");
    assert_ne!(updated["updatedAt"], updated["createdAt"]);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/todo-changes/history/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ops: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["operationType"].as_str().unwrap())
        .collect();
    assert_eq!(ops, vec!["CREATE", "UPDATE", "DELETE"]);
    assert_eq!(history[2]["title"], "B");
    assert_eq!(history[2]["todoId"], id);

    let event_id = history[0]["id"].as_str().unwrap();
    let (status, event) = send(
        &app,
        Method::GET,
        &format!("/api/todo-changes/{event_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event, history[0]);
}

#[tokio::test]
async fn test_change_queries() {
    let app = app(AppState::in_memory());
    let a = create(&app, "alice", "A").await;
    create(&app, "bob", "B").await;
    let a_id = a["id"].as_str().unwrap();
    send(&app, Method::DELETE, &format!("/api/todos/{a_id}"), None).await;

    let (_, all) = send(&app, Method::GET, "/api/todo-changes", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, by_user) = send(&app, Method::GET, "/api/todo-changes/user/bob", None).await;
    assert_eq!(by_user.as_array().unwrap().len(), 1);

    let (_, by_todo) = send(
        &app,
        Method::GET,
        &format!("/api/todo-changes/todo/{a_id}"),
        None,
    )
    .await;
    assert_eq!(by_todo.as_array().unwrap().len(), 2);

    let (status, creates) =
        send(&app, Method::GET, "/api/todo-changes/operation/create", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(creates.as_array().unwrap().len(), 2);

    let (_, unknown) = send(&app, Method::GET, "/api/todo-changes/user/carol", None).await;
    assert_eq!(unknown, json!([]));
}

#[tokio::test]
async fn test_unknown_operation_type_is_bad_request() {
    let app = app(AppState::in_memory());

    let (status, body) =
        send(&app, Method::GET, "/api/todo-changes/operation/RENAME", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["errors"]["operationType"].is_string());
}

#[tokio::test]
async fn test_validation_errors_name_each_field() {
    let app = app(AppState::in_memory());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/todos",
        Some(json!({ "title": "  " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["errors"]["title"], "Title is required");
    assert_eq!(body["errors"]["content"], "Content is required");
    assert_eq!(body["errors"]["uid"], "User ID is required");

    let (_, events) = send(&app, Method::GET, "/api/todo-changes", None).await;
    assert_eq!(events, json!([]));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app(AppState::in_memory());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let app = app(AppState::in_memory());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/todos")
        .body(Body::from(r#"{"uid":"u1","title":"t","content":"c"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_update_right_after_create_is_recorded_as_update() {
    let app = app(AppState::in_memory());

    for i in 0..20 {
        let todo = create(&app, "u1", &format!("A{i}")).await;
        let id = todo["id"].as_str().unwrap().to_string();
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/todos/{id}"),
            Some(json!({ "title": "B", "content": "content", "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, events) = send(
            &app,
            Method::GET,
            &format!("/api/todo-changes/todo/{id}"),
            None,
        )
        .await;
        let ops: Vec<&str> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["operationType"].as_str().unwrap())
            .collect();
        assert_eq!(ops, vec!["CREATE", "UPDATE"]);
    }
}

#[tokio::test]
async fn test_update_without_completed_keeps_todo() {
    let app = app(AppState::in_memory());
    let (_, todo) = send(
        &app,
        Method::POST,
        "/api/todos",
        Some(json!({ "uid": "u1", "title": "A", "content": "a", "completed": true })),
    )
    .await;
    let id = todo["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/todos/{id}"),
        Some(json!({ "title": "B", "content": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["completed"], "Completed status is required");

    let (_, stored) = send(&app, Method::GET, &format!("/api/todos/{id}"), None).await;
    assert_eq!(stored["title"], "A");
    assert_eq!(stored["completed"], true);

    let (_, events) = send(
        &app,
        Method::GET,
        &format!("/api/todo-changes/todo/{id}"),
        None,
    )
    .await;
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_todo_is_not_found() {
    let app = app(AppState::in_memory());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/todos/000000000000000000000000",
        Some(json!({ "title": "t", "content": "c", "completed": false })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(
        body["message"],
        "Todo not found with id: 000000000000000000000000"
    );

    let (status, _) = send(&app, Method::DELETE, "/api/todos/not-an-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/api/todo-changes/not-an-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
