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

//! Read-only change event endpoints under `/api/todo-changes`.

use crate::dto::ChangeEventResponse;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use bson::oid::ObjectId;
use todo_audit_core::event::{ChangeEvent, OperationType};

fn respond(events: Vec<ChangeEvent>) -> Json<Vec<ChangeEventResponse>> {
    Json(events.into_iter().map(ChangeEventResponse::from).collect())
}

/// `GET /api/todo-changes`
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChangeEventResponse>>, ApiError> {
    Ok(respond(state.changes.find_all().await?))
}

/// `GET /api/todo-changes/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChangeEventResponse>, ApiError> {
    let not_found = || ApiError::not_found(format!("Change event not found with id: {id}"));

    let oid = ObjectId::parse_str(&id).map_err(|_| not_found())?;
    let event = state.changes.find_by_id(&oid).await?.ok_or_else(not_found)?;
    Ok(Json(event.into()))
}

/// `GET /api/todo-changes/todo/{todoId}`
pub async fn by_todo(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
) -> Result<Json<Vec<ChangeEventResponse>>, ApiError> {
    Ok(respond(state.changes.find_by_todo_id(&todo_id).await?))
}

/// `GET /api/todo-changes/user/{uid}`
pub async fn by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Vec<ChangeEventResponse>>, ApiError> {
    Ok(respond(state.changes.find_by_uid(&uid).await?))
}

/// `GET /api/todo-changes/operation/{operationType}`
///
/// Unknown operation names are a 400, not an empty list.
pub async fn by_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
) -> Result<Json<Vec<ChangeEventResponse>>, ApiError> {
    let operation = operation
        .parse::<OperationType>()
        .map_err(|e| ApiError::invalid_field("operationType", e.to_string()))?;
    Ok(respond(state.changes.find_by_operation_type(operation).await?))
}

/// `GET /api/todo-changes/history/{todoId}`, oldest first.
pub async fn history(
    State(state): State<AppState>,
    Path(todo_id): Path<String>,
) -> Result<Json<Vec<ChangeEventResponse>>, ApiError> {
    Ok(respond(state.changes.get_change_history(&todo_id).await?))
}
