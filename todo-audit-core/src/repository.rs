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

//! Todo repository: auditing timestamps and lifecycle dispatch.
//!
//! [`TodoRepository`] is the storage-access layer the CRUD service talks to.
//! It owns two concerns the store itself does not:
//!
//! - **Auditing**: `create` stamps `createdAt` and `updatedAt` with the same
//!   instant; `save` refreshes `updatedAt` before replacing the document.
//! - **Lifecycle dispatch**: after the store commits, every registered
//!   [`LifecycleListener`] is called in registration order, in the same call
//!   stack, before the repository returns.
//!
//! The Todo write and whatever a listener writes are independent operations.
//! A listener failure never rolls back the Todo write; the
//! [`CaptureFailurePolicy`] only decides whether the caller hears about it.

use crate::capture::CaptureError;
use crate::lifecycle::{LifecycleEvent, LifecycleListener};
use crate::metrics;
use crate::store::{StoreError, TodoStore};
use crate::todo::{audit_timestamp, next_audit_timestamp, NewTodo, Todo};
use bson::oid::ObjectId;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// What a failed lifecycle listener does to the mutation's result.
///
/// Decode failures of deleted documents are always returned, whatever the
/// policy, since they point at corrupt stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFailurePolicy {
    /// Log the failure and return the committed result unchanged.
    #[default]
    Log,

    /// Return [`RepositoryError::Capture`] although the write is committed.
    Propagate,
}

impl FromStr for CaptureFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!(
                "unknown capture failure policy `{other}`, expected `log` or `propagate`"
            )),
        }
    }
}

impl fmt::Display for CaptureFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => f.write_str("log"),
            Self::Propagate => f.write_str("propagate"),
        }
    }
}

/// Errors returned by the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The Todo to save does not exist (anymore).
    #[error("Todo {0} not found")]
    NotFound(ObjectId),

    /// The store rejected or failed the operation; nothing was committed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The write was committed but a listener failed.
    #[error("Todo {todo_id} was committed but its change event was not: {source}")]
    Capture {
        /// Hex id of the affected Todo
        todo_id: String,
        /// The listener error
        #[source]
        source: CaptureError,
    },
}

/// Storage-access layer for Todos with auditing and lifecycle notifications.
#[derive(Clone)]
pub struct TodoRepository {
    store: Arc<dyn TodoStore>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
    failure_policy: CaptureFailurePolicy,
}

impl fmt::Debug for TodoRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoRepository")
            .field("listeners", &self.listeners.len())
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl TodoRepository {
    /// Creates a repository over the given store, with no listeners.
    #[must_use]
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
            failure_policy: CaptureFailurePolicy::default(),
        }
    }

    /// Registers a lifecycle listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Sets the failure policy for listener errors.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: CaptureFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Inserts a new Todo with a generated id and equal timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the insert fails, or
    /// [`RepositoryError::Capture`] per the failure policy.
    #[instrument(skip(self, new_todo), fields(uid = %new_todo.uid))]
    pub async fn create(&self, new_todo: NewTodo) -> Result<Todo, RepositoryError> {
        let todo = new_todo.into_todo(ObjectId::new(), audit_timestamp());
        self.store.insert(&todo).await?;
        debug!(todo_id = %todo.id, "Inserted todo");

        self.publish(&todo.id_hex(), LifecycleEvent::Saved(todo.clone()))
            .await?;
        Ok(todo)
    }

    /// Refreshes `updated_at` and replaces the stored Todo.
    ///
    /// The new `updated_at` is always at least one millisecond past the
    /// previous one, so a saved Todo never reads as pristine.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the Todo no longer exists,
    /// [`RepositoryError::Store`] if the write fails, or
    /// [`RepositoryError::Capture`] per the failure policy.
    #[instrument(skip(self, todo), fields(todo_id = %todo.id))]
    pub async fn save(&self, mut todo: Todo) -> Result<Todo, RepositoryError> {
        todo.updated_at = next_audit_timestamp(todo.updated_at);
        self.save_unaudited(todo).await
    }

    /// Replaces the stored Todo exactly as given, without touching
    /// `updated_at`.
    ///
    /// Used for imports and for reproducing saves whose timestamps are fixed
    /// by the caller. A Todo passed here with `updated_at == created_at` is
    /// reported to listeners as a fresh creation.
    ///
    /// # Errors
    ///
    /// Same as [`TodoRepository::save`].
    pub async fn save_unaudited(&self, todo: Todo) -> Result<Todo, RepositoryError> {
        if !self.store.replace(&todo).await? {
            return Err(RepositoryError::NotFound(todo.id));
        }
        debug!(todo_id = %todo.id, "Replaced todo");

        self.publish(&todo.id_hex(), LifecycleEvent::Saved(todo.clone()))
            .await?;
        Ok(todo)
    }

    /// Retrieves a Todo by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the read fails.
    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Todo>, RepositoryError> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Lists all Todos in natural storage order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the read fails.
    pub async fn find_all(&self) -> Result<Vec<Todo>, RepositoryError> {
        Ok(self.store.find_all().await?)
    }

    /// Deletes a Todo. Returns `false` if it did not exist, in which case no
    /// notification is fired.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] if the delete fails, or
    /// [`RepositoryError::Capture`] per the failure policy.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ObjectId) -> Result<bool, RepositoryError> {
        let Some(raw) = self.store.delete(id).await? else {
            debug!(todo_id = %id, "Nothing to delete");
            return Ok(false);
        };
        debug!(todo_id = %id, "Deleted todo");

        self.publish(&id.to_hex(), LifecycleEvent::Deleted(raw))
            .await?;
        Ok(true)
    }

    /// Fires a notification to every listener in registration order.
    async fn publish(&self, todo_id: &str, event: LifecycleEvent) -> Result<(), RepositoryError> {
        metrics::increment_todo_mutations(event.kind());

        let mut first_error = None;
        for listener in &self.listeners {
            if let Err(e) = listener.on_event(&event).await {
                let surfaced = matches!(e, CaptureError::Decode(_))
                    || self.failure_policy == CaptureFailurePolicy::Propagate;

                if surfaced {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                } else {
                    warn!(
                        todo_id,
                        lifecycle = event.kind(),
                        error = %e,
                        "Lifecycle listener failed; mutation result returned unchanged"
                    );
                }
            }
        }

        match first_error {
            Some(source) => Err(RepositoryError::Capture {
                todo_id: todo_id.to_string(),
                source,
            }),
            None => Ok(()),
        }
    }
}
