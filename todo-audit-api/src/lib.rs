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

//! HTTP surface of the Todo audit service.
//!
//! Exposes Todo CRUD under `/api/todos` and the read-only change history
//! under `/api/todo-changes`. Every successful Todo write or delete leaves
//! exactly one change event behind.
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_audit_api::{app, state::AppState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = app(AppState::in_memory());
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::get;
use axum::Router;
use handlers::{changes, health, todos};
use state::AppState;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/todos", get(todos::list).post(todos::create))
        .route(
            "/api/todos/{id}",
            get(todos::get).put(todos::update).delete(todos::delete),
        )
        .route("/api/todo-changes", get(changes::list))
        .route("/api/todo-changes/{id}", get(changes::get))
        .route("/api/todo-changes/todo/{todo_id}", get(changes::by_todo))
        .route("/api/todo-changes/user/{uid}", get(changes::by_user))
        .route(
            "/api/todo-changes/operation/{operation_type}",
            get(changes::by_operation),
        )
        .route("/api/todo-changes/history/{todo_id}", get(changes::history))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
