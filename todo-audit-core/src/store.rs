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

//! Storage seams for Todos and change events.
//!
//! [`TodoStore`] and [`ChangeEventStore`] abstract the document database so
//! the repository, the change capture and the query service never talk to a
//! driver directly. Backends live in the `todo-audit-stores` crate.
//!
//! # Example
//!
//! ```rust
//! use todo_audit_core::event::ChangeEvent;
//! use todo_audit_core::store::{ChangeEventStore, StoreError};
//! use bson::oid::ObjectId;
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! // Minimal append-only store for testing
//! #[derive(Default)]
//! struct VecEventStore {
//!     events: Arc<Mutex<Vec<ChangeEvent>>>,
//! }
//!
//! #[async_trait::async_trait]
//! impl ChangeEventStore for VecEventStore {
//!     async fn insert(&self, event: ChangeEvent) -> Result<ChangeEvent, StoreError> {
//!         let event = event.with_id(ObjectId::new());
//!         self.events.lock().await.push(event.clone());
//!         Ok(event)
//!     }
//!
//!     async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError> {
//!         Ok(self.events.lock().await.clone())
//!     }
//!
//!     async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError> {
//!         Ok(self.events.lock().await.iter().find(|e| e.id == Some(*id)).cloned())
//!     }
//!
//!     async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
//!         let events = self.events.lock().await;
//!         Ok(events.iter().filter(|e| e.todo_id == todo_id).cloned().collect())
//!     }
//!
//!     async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError> {
//!         let events = self.events.lock().await;
//!         Ok(events.iter().filter(|e| e.uid == uid).cloned().collect())
//!     }
//!
//!     async fn delete_all(&self) -> Result<u64, StoreError> {
//!         let mut events = self.events.lock().await;
//!         let count = events.len() as u64;
//!         events.clear();
//!         Ok(count)
//!     }
//! }
//! ```

use crate::event::ChangeEvent;
use crate::metrics::ErrorCategory;
use crate::todo::{DocumentError, Todo};
use bson::oid::ObjectId;
use bson::Document;

/// Storage for Todo documents.
///
/// Implementations must be safe to share across request handlers.
#[async_trait::async_trait]
pub trait TodoStore: Send + Sync {
    /// Inserts a new Todo.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] if a unique constraint is violated,
    /// or another error if the write fails.
    async fn insert(&self, todo: &Todo) -> Result<(), StoreError>;

    /// Replaces the stored Todo with the same id.
    ///
    /// Returns `false` if no Todo with that id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn replace(&self, todo: &Todo) -> Result<bool, StoreError>;

    /// Retrieves a Todo by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored document is malformed.
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Todo>, StoreError>;

    /// Lists all Todos in natural storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a stored document is malformed.
    async fn find_all(&self) -> Result<Vec<Todo>, StoreError>;

    /// Removes a Todo and returns the raw document as it was stored right
    /// before removal.
    ///
    /// Returns `None` if no Todo with that id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete(&self, id: &ObjectId) -> Result<Option<Document>, StoreError>;

    /// Closes the store, releasing any resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be closed cleanly.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Append-only storage for change events.
#[async_trait::async_trait]
pub trait ChangeEventStore: Send + Sync {
    /// Inserts an event and returns it with its generated id.
    ///
    /// # Errors
    ///
    /// Returns an error on connectivity problems or constraint violations.
    async fn insert(&self, event: ChangeEvent) -> Result<ChangeEvent, StoreError>;

    /// Lists all events in natural storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError>;

    /// Retrieves one event by its own id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError>;

    /// Lists the events of one Todo in natural storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError>;

    /// Lists the events of one user in natural storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError>;

    /// Removes every event and returns how many were removed.
    ///
    /// Only meant for test cleanup; normal operation never removes events.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// Closes the store, releasing any resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be closed cleanly.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A stored document could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A unique index rejected the write
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other errors
    #[error("Store error: {0}")]
    Other(String),
}

impl From<DocumentError> for StoreError {
    fn from(err: DocumentError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl StoreError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Other(_))
    }

    /// Returns the metrics category for this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) => ErrorCategory::Connection,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::DuplicateKey(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Other(_) => ErrorCategory::Unknown,
        }
    }
}
