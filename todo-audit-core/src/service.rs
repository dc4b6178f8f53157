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

//! Todo CRUD service.
//!
//! Validates input, resolves ids and delegates to [`TodoRepository`]. Change
//! capture happens underneath, in the repository's lifecycle listeners.

use crate::repository::{RepositoryError, TodoRepository};
use crate::todo::{NewTodo, Todo};
use bson::oid::ObjectId;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Input for creating a Todo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTodo {
    /// Owning user, required
    pub uid: String,
    /// Title, required
    pub title: String,
    /// Content, required
    pub content: String,
    /// Completion flag
    pub completed: bool,
}

/// Input for replacing a Todo's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTodo {
    /// Title, required
    pub title: String,
    /// Content, required
    pub content: String,
    /// Completion flag
    pub completed: bool,
}

/// Field name to message, ordered by field name.
pub type FieldErrors = BTreeMap<String, String>;

impl CreateTodo {
    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns every blank field with its message.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Title is required");
        require(&mut errors, "content", &self.content, "Content is required");
        require(&mut errors, "uid", &self.uid, "User ID is required");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateTodo {
    /// Checks required fields.
    ///
    /// # Errors
    ///
    /// Returns every blank field with its message.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title, "Title is required");
        require(&mut errors, "content", &self.content, "Content is required");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), message.to_string());
    }
}

/// Errors returned by [`TodoService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No Todo with this id (including ids that are not valid hex)
    #[error("Todo not found with id: {0}")]
    NotFound(String),

    /// Input failed validation
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Storage or capture failure
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id.to_hex()),
            other => Self::Repository(other),
        }
    }
}

/// CRUD operations over Todos.
#[derive(Debug, Clone)]
pub struct TodoService {
    repository: TodoRepository,
}

impl TodoService {
    /// Creates a service over the given repository.
    #[must_use]
    pub fn new(repository: TodoRepository) -> Self {
        Self { repository }
    }

    /// Lists all Todos.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Repository`] if the read fails.
    pub async fn find_all(&self) -> Result<Vec<Todo>, ServiceError> {
        Ok(self.repository.find_all().await?)
    }

    /// Retrieves one Todo.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown or malformed ids.
    pub async fn find_by_id(&self, id: &str) -> Result<Todo, ServiceError> {
        let oid = parse_id(id)?;
        self.repository
            .find_by_id(&oid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Creates a Todo.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for blank fields, or
    /// [`ServiceError::Repository`] if the write or its capture fails.
    pub async fn create(&self, input: CreateTodo) -> Result<Todo, ServiceError> {
        input.validate().map_err(ServiceError::Validation)?;

        let new_todo =
            NewTodo::new(input.uid, input.title, input.content).completed(input.completed);
        let todo = self.repository.create(new_todo).await?;
        info!(todo_id = %todo.id, "Created todo");
        Ok(todo)
    }

    /// Replaces title, content and completion of an existing Todo.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for blank fields,
    /// [`ServiceError::NotFound`] if the Todo does not exist, or
    /// [`ServiceError::Repository`] if the write or its capture fails.
    pub async fn update(&self, id: &str, input: UpdateTodo) -> Result<Todo, ServiceError> {
        input.validate().map_err(ServiceError::Validation)?;

        let mut todo = self.find_by_id(id).await?;
        todo.apply(input.title, input.content, input.completed);
        let todo = self.repository.save(todo).await?;
        info!(todo_id = %todo.id, "Updated todo");
        Ok(todo)
    }

    /// Deletes a Todo.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the Todo does not exist, or
    /// [`ServiceError::Repository`] if the delete or its capture fails.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let oid = parse_id(id)?;
        if !self.repository.delete(&oid).await? {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        info!(todo_id = %oid, "Deleted todo");
        Ok(())
    }
}

fn parse_id(id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(id).map_err(|_| ServiceError::NotFound(id.to_string()))
}
