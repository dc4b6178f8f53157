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

//! Read-only access to the change event log.
//!
//! Listing operations return events in natural storage order, except
//! [`ChangeEventQueryService::get_change_history`] which sorts by the event's
//! own recording time. Filtering by operation type happens in memory over the
//! full log.

use crate::event::{ChangeEvent, OperationType};
use crate::store::{ChangeEventStore, StoreError};
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::debug;

/// Query service over a [`ChangeEventStore`].
#[derive(Clone)]
pub struct ChangeEventQueryService {
    store: Arc<dyn ChangeEventStore>,
}

impl ChangeEventQueryService {
    /// Creates a query service reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ChangeEventStore>) -> Self {
        Self { store }
    }

    /// Every recorded event.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError> {
        self.store.find_all().await
    }

    /// One event by its own id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError> {
        self.store.find_by_id(id).await
    }

    /// Events of one Todo. Unknown ids yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        self.store.find_by_todo_id(todo_id).await
    }

    /// Events of one user. Unknown users yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        self.store.find_by_uid(uid).await
    }

    /// Events of one operation type, filtered in memory over the full log.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn find_by_operation_type(
        &self,
        operation: OperationType,
    ) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut events = self.store.find_all().await?;
        events.retain(|e| e.operation == operation);
        debug!(%operation, count = events.len(), "Filtered change events");
        Ok(events)
    }

    /// Events of one Todo, oldest first by recording time.
    ///
    /// Ties keep their storage order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_change_history(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        let mut events = self.store.find_by_todo_id(todo_id).await?;
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}
