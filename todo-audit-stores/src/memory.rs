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

//! In-memory store implementations.
//!
//! This module provides thread-safe, in-memory implementations of
//! [`TodoStore`] and [`ChangeEventStore`].
//!
//! # Use Cases
//!
//! The in-memory stores are suitable for:
//!
//! - **Local development and testing** - No external dependencies required
//! - **Single-instance demos** - Where durability isn't needed
//!
//! # Limitations
//!
//! - **No persistence** - Todos and events are lost on process restart
//! - **Single process only** - Cannot be shared across multiple instances
//! - **No unique index** - The `(uid, createdAt)` constraint enforced by
//!   `MongoDB` is not checked here
//!
//! Todos are kept as raw BSON documents, the way the database would hold
//! them, so the delete path hands the change capture exactly what was stored.
//!
//! # Example
//!
//! ```rust
//! use todo_audit_stores::memory::{MemoryChangeEventStore, MemoryTodoStore};
//! use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
//! use todo_audit_core::repository::TodoRepository;
//! use todo_audit_core::todo::NewTodo;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let events = Arc::new(MemoryChangeEventStore::new());
//! let capture = ChangeCapture::new(events.clone(), CaptureConfig::default());
//!
//! let repository = TodoRepository::new(Arc::new(MemoryTodoStore::new()))
//!     .with_listener(Arc::new(capture));
//!
//! repository.create(NewTodo::new("user-1", "Title", "Body")).await?;
//! assert_eq!(events.len().await, 1);
//! # Ok(())
//! # }
//! ```

use bson::oid::ObjectId;
use bson::Document;
use std::sync::Arc;
use todo_audit_core::event::ChangeEvent;
use todo_audit_core::store::{ChangeEventStore, StoreError, TodoStore};
use todo_audit_core::todo::{fields, Todo};
use tokio::sync::RwLock;
use tracing::{debug, trace};

fn has_id(doc: &Document, id: &ObjectId) -> bool {
    doc.get_object_id(fields::ID).ok() == Some(*id)
}

/// In-memory Todo store keeping raw documents in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryTodoStore {
    docs: Arc<RwLock<Vec<Document>>>,
}

impl MemoryTodoStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating new in-memory todo store");
        Self::default()
    }

    /// Creates a store pre-populated with raw documents.
    ///
    /// Documents are stored as given, without validation. Useful for testing
    /// how malformed data flows through the delete path.
    #[must_use]
    pub fn with_documents(docs: Vec<Document>) -> Self {
        debug!(
            document_count = docs.len(),
            "Creating in-memory todo store with initial documents"
        );
        Self {
            docs: Arc::new(RwLock::new(docs)),
        }
    }

    /// Returns the number of stored Todos.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// Returns `true` if the store holds no Todos.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Removes every Todo.
    pub async fn clear(&self) {
        let mut docs = self.docs.write().await;
        let count = docs.len();
        docs.clear();
        debug!(cleared_count = count, "Cleared all todos from memory store");
    }
}

#[async_trait::async_trait]
impl TodoStore for MemoryTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| has_id(d, &todo.id)) {
            return Err(StoreError::DuplicateKey(format!("_id {}", todo.id)));
        }
        docs.push(todo.to_document());

        debug!(todo_id = %todo.id, total = docs.len(), "Inserted todo into memory");
        Ok(())
    }

    async fn replace(&self, todo: &Todo) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| has_id(d, &todo.id)) {
            Some(doc) => {
                *doc = todo.to_document();
                debug!(todo_id = %todo.id, "Replaced todo in memory");
                Ok(true)
            }
            None => {
                debug!(todo_id = %todo.id, "No todo to replace in memory");
                Ok(false)
            }
        }
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Todo>, StoreError> {
        trace!(todo_id = %id, "Looking up todo in memory");

        let docs = self.docs.read().await;
        docs.iter()
            .find(|d| has_id(d, id))
            .map(|d| Todo::try_from(d).map_err(StoreError::from))
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        let docs = self.docs.read().await;
        docs.iter()
            .map(|d| Todo::try_from(d).map_err(StoreError::from))
            .collect()
    }

    async fn delete(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let mut docs = self.docs.write().await;
        let removed = docs
            .iter()
            .position(|d| has_id(d, id))
            .map(|index| docs.remove(index));

        if removed.is_some() {
            debug!(todo_id = %id, remaining = docs.len(), "Deleted todo from memory");
        }
        Ok(removed)
    }

    async fn close(&self) -> Result<(), StoreError> {
        debug!("Closing in-memory todo store (no-op)");
        Ok(())
    }
}

/// In-memory, append-only change event store.
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeEventStore {
    events: Arc<RwLock<Vec<ChangeEvent>>>,
}

impl MemoryChangeEventStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        debug!("Creating new in-memory change event store");
        Self::default()
    }

    /// Returns the number of recorded events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` if no event has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ChangeEventStore for MemoryChangeEventStore {
    async fn insert(&self, event: ChangeEvent) -> Result<ChangeEvent, StoreError> {
        let event = match event.id {
            Some(_) => event,
            None => event.with_id(ObjectId::new()),
        };

        let mut events = self.events.write().await;
        events.push(event.clone());

        trace!(
            todo_id = %event.todo_id,
            operation = %event.operation,
            total = events.len(),
            "Appended change event to memory"
        );
        Ok(event)
    }

    async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError> {
        Ok(self.events.read().await.clone())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.id.as_ref() == Some(id)).cloned())
    }

    async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.todo_id == todo_id)
            .cloned()
            .collect())
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| e.uid == uid).cloned().collect())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut events = self.events.write().await;
        let count = events.len() as u64;
        events.clear();
        debug!(cleared_count = count, "Cleared all change events from memory store");
        Ok(count)
    }

    async fn close(&self) -> Result<(), StoreError> {
        debug!("Closing in-memory change event store (no-op)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_audit_core::event::OperationType;
    use todo_audit_core::todo::{audit_timestamp, NewTodo};

    fn todo(uid: &str) -> Todo {
        NewTodo::new(uid, "Title", "Body").into_todo(ObjectId::new(), audit_timestamp())
    }

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = MemoryTodoStore::new();
        assert!(store.is_empty().await);
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryTodoStore::new();
        let todo = todo("u1");

        store.insert(&todo).await.expect("Failed to insert todo");

        let found = store.find_by_id(&todo.id).await.expect("Failed to find");
        assert_eq!(found, Some(todo));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryTodoStore::new();
        let todo = todo("u1");
        store.insert(&todo).await.unwrap();

        let err = store.insert(&todo).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn test_replace_keeps_position() {
        let store = MemoryTodoStore::new();
        let first = todo("u1");
        let second = todo("u2");
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let mut changed = first.clone();
        changed.apply("Renamed", "Body", true);
        assert!(store.replace(&changed).await.unwrap());

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![changed, second]);
    }

    #[tokio::test]
    async fn test_replace_missing_returns_false() {
        let store = MemoryTodoStore::new();
        assert!(!store.replace(&todo("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_returns_stored_document() {
        let store = MemoryTodoStore::new();
        let todo = todo("u1");
        store.insert(&todo).await.unwrap();

        let raw = store.delete(&todo.id).await.unwrap();
        assert_eq!(raw, Some(todo.to_document()));
        assert!(store.delete(&todo.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_document_is_a_serialization_error() {
        let mut raw = todo("u1").to_document();
        raw.remove("title");
        let store = MemoryTodoStore::with_documents(vec![raw]);

        let err = store.find_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryTodoStore::new();
        store.insert(&todo("u1")).await.unwrap();
        store.clear().await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_event_insert_assigns_id() {
        let store = MemoryChangeEventStore::new();
        let event = ChangeEvent::from_saved(&todo("u1"), audit_timestamp());

        let stored = store.insert(event).await.unwrap();

        let id = stored.id.expect("id assigned");
        assert_eq!(store.find_by_id(&id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_event_queries_keep_insertion_order() {
        let store = MemoryChangeEventStore::new();
        let a = todo("alice");
        let b = todo("bob");
        let now = audit_timestamp();

        store.insert(ChangeEvent::from_saved(&a, now)).await.unwrap();
        store.insert(ChangeEvent::from_saved(&b, now)).await.unwrap();
        store
            .insert(ChangeEvent::snapshot(&a, OperationType::Delete, now))
            .await
            .unwrap();

        let for_a = store.find_by_todo_id(&a.id_hex()).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a[0].is_create());
        assert!(for_a[1].is_delete());

        assert_eq!(store.find_by_uid("bob").await.unwrap().len(), 1);
        assert!(store.find_by_uid("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_events() {
        let store = MemoryChangeEventStore::new();
        let now = audit_timestamp();
        store.insert(ChangeEvent::from_saved(&todo("u1"), now)).await.unwrap();
        store.insert(ChangeEvent::from_saved(&todo("u2"), now)).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_event_inserts() {
        let store = Arc::new(MemoryChangeEventStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let todo = todo(&format!("user-{i}"));
                store
                    .insert(ChangeEvent::from_saved(&todo, audit_timestamp()))
                    .await
                    .expect("Failed to insert event");
            }));
        }

        for handle in handles {
            handle.await.expect("Task panicked");
        }

        assert_eq!(store.len().await, 10);
    }
}
