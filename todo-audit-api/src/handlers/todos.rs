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

//! Todo CRUD endpoints under `/api/todos`.

use crate::dto::{CreateTodoRequest, TodoResponse, UpdateTodoRequest};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use todo_audit_core::service::UpdateTodo;

/// `GET /api/todos`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TodoResponse>>, ApiError> {
    let todos = state.todos.find_all().await?;
    Ok(Json(todos.into_iter().map(TodoResponse::from).collect()))
}

/// `GET /api/todos/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.todos.find_by_id(&id).await?;
    Ok(Json(todo.into()))
}

/// `POST /api/todos`, answering 201 with the created Todo.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let Json(request) = payload?;
    let todo = state.todos.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(todo.into())))
}

/// `PUT /api/todos/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<TodoResponse>, ApiError> {
    let Json(request) = payload?;
    let update = UpdateTodo::try_from(request).map_err(ApiError::validation)?;
    let todo = state.todos.update(&id, update).await?;
    Ok(Json(todo.into()))
}

/// `DELETE /api/todos/{id}`, answering 204.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.todos.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
