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

//! JSON request and response bodies.
//!
//! Field names are camelCase, ids are hex strings and timestamps RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_audit_core::event::{ChangeEvent, OperationType};
use todo_audit_core::service::{CreateTodo, FieldErrors, UpdateTodo};
use todo_audit_core::todo::Todo;

/// Body of `POST /api/todos`.
///
/// Missing fields deserialize as empty so validation can name them.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTodoRequest {
    /// Owning user
    pub uid: String,
    /// Title
    pub title: String,
    /// Content
    pub content: String,
    /// Completion flag
    pub completed: bool,
}

impl From<CreateTodoRequest> for CreateTodo {
    fn from(req: CreateTodoRequest) -> Self {
        Self {
            uid: req.uid,
            title: req.title,
            content: req.content,
            completed: req.completed,
        }
    }
}

/// Body of `PUT /api/todos/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    /// Title
    pub title: String,
    /// Content
    pub content: String,
    /// Completion flag, required
    pub completed: Option<bool>,
}

impl TryFrom<UpdateTodoRequest> for UpdateTodo {
    type Error = FieldErrors;

    fn try_from(req: UpdateTodoRequest) -> Result<Self, Self::Error> {
        let update = Self {
            title: req.title,
            content: req.content,
            completed: req.completed.unwrap_or_default(),
        };
        let mut errors = update.validate().err().unwrap_or_default();
        if req.completed.is_none() {
            errors.insert("completed".into(), "Completed status is required".into());
        }
        if errors.is_empty() {
            Ok(update)
        } else {
            Err(errors)
        }
    }
}

/// A Todo as returned by the API.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: String,
    pub uid: String,
    pub title: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id.to_hex(),
            uid: todo.uid,
            title: todo.title,
            content: todo.content,
            completed: todo.completed,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

/// A change event as returned by the API.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventResponse {
    pub id: Option<String>,
    pub todo_id: String,
    pub uid: String,
    pub operation_type: OperationType,
    pub title: String,
    pub content: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub todo_created_at: DateTime<Utc>,
    pub todo_updated_at: DateTime<Utc>,
}

impl From<ChangeEvent> for ChangeEventResponse {
    fn from(event: ChangeEvent) -> Self {
        Self {
            id: event.id.map(|id| id.to_hex()),
            todo_id: event.todo_id,
            uid: event.uid,
            operation_type: event.operation,
            title: event.title,
            content: event.content,
            completed: event.completed,
            created_at: event.created_at,
            todo_created_at: event.todo_created_at,
            todo_updated_at: event.todo_updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use todo_audit_core::todo::audit_timestamp;

    #[test]
    fn test_todo_response_uses_camel_case() {
        let now = audit_timestamp();
        let todo = Todo::new(ObjectId::new(), "u1", "t", "c", false, now, now);

        let json = serde_json::to_value(TodoResponse::from(todo.clone())).unwrap();

        assert_eq!(json["id"], todo.id.to_hex());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn test_change_event_response_names_operation_type() {
        let now = audit_timestamp();
        let todo = Todo::new(ObjectId::new(), "u1", "t", "c", true, now, now);
        let event = ChangeEvent::snapshot(&todo, OperationType::Delete, now);

        let json = serde_json::to_value(ChangeEventResponse::from(event)).unwrap();

        assert_eq!(json["operationType"], "DELETE");
        assert_eq!(json["todoId"], todo.id.to_hex());
        assert!(json.get("todoUpdatedAt").is_some());
    }

    #[test]
    fn test_missing_request_fields_default_to_empty() {
        let req: CreateTodoRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(req.title, "x");
        assert!(req.uid.is_empty());
        assert!(!req.completed);
    }

    #[test]
    fn test_update_without_completed_is_rejected() {
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"title":"t","content":"c"}"#).unwrap();

        let errors = UpdateTodo::try_from(req).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors["completed"], "Completed status is required");
    }

    #[test]
    fn test_update_reports_every_missing_field() {
        let req: UpdateTodoRequest = serde_json::from_str("{}").unwrap();

        let errors = UpdateTodo::try_from(req).unwrap_err();

        assert_eq!(
            errors.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["completed", "content", "title"]
        );
    }

    #[test]
    fn test_update_keeps_explicit_false() {
        let req: UpdateTodoRequest =
            serde_json::from_str(r#"{"title":"t","content":"c","completed":false}"#).unwrap();

        let update = UpdateTodo::try_from(req).unwrap();

        assert!(!update.completed);
    }
}
