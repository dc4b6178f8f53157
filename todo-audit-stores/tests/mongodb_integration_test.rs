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

#![cfg(feature = "mongodb-store")]

use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;
use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
use todo_audit_core::event::OperationType;
use todo_audit_core::query::ChangeEventQueryService;
use todo_audit_core::repository::TodoRepository;
use todo_audit_core::store::{ChangeEventStore, StoreError, TodoStore};
use todo_audit_core::todo::{audit_timestamp, NewTodo};
use todo_audit_stores::mongodb::{MongoConfig, MongoStore};

/// Helper to start a container and connect a store to it.
async fn start_store() -> (ContainerAsync<Mongo>, MongoStore) {
    let container = Mongo::default()
        .start()
        .await
        .expect("failed to start MongoDB container");

    let host_port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("failed to get port");

    let config = MongoConfig::builder()
        .uri(format!("mongodb://127.0.0.1:{host_port}"))
        .database("todo_test")
        .max_pool_size(5)
        .min_pool_size(1)
        .build()
        .expect("valid config");

    let store = MongoStore::connect(config)
        .await
        .expect("failed to connect");
    store.ensure_indexes().await.expect("failed to create indexes");

    (container, store)
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_mongodb_todo_crud() {
    let (_container, store) = start_store().await;
    let todos = store.todo_store();

    let mut todo = NewTodo::new("u1", "Title", "Body").into_todo(
        bson::oid::ObjectId::new(),
        audit_timestamp(),
    );
    todos.insert(&todo).await.expect("failed to insert");

    let found = todos.find_by_id(&todo.id).await.expect("failed to find");
    assert_eq!(found, Some(todo.clone()));

    todo.apply("Renamed", "Body", true);
    assert!(todos.replace(&todo).await.expect("failed to replace"));

    let raw = todos
        .delete(&todo.id)
        .await
        .expect("failed to delete")
        .expect("document returned");
    assert_eq!(raw.get_str("title").unwrap(), "Renamed");
    assert!(todos.delete(&todo.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_mongodb_unique_uid_created_at() {
    let (_container, store) = start_store().await;
    let todos = store.todo_store();
    let at = audit_timestamp();

    let first = NewTodo::new("u1", "A", "a").into_todo(bson::oid::ObjectId::new(), at);
    let second = NewTodo::new("u1", "B", "b").into_todo(bson::oid::ObjectId::new(), at);

    todos.insert(&first).await.expect("failed to insert");
    let err = todos.insert(&second).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(_)));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_mongodb_audit_trail() {
    let (_container, store) = start_store().await;
    let events = Arc::new(store.change_event_store());
    let repository = TodoRepository::new(Arc::new(store.todo_store())).with_listener(Arc::new(
        ChangeCapture::new(events.clone(), CaptureConfig::default()),
    ));
    let queries = ChangeEventQueryService::new(events.clone());

    let todo = repository
        .create(NewTodo::new("u1", "A", "a"))
        .await
        .expect("failed to create");
    let mut changed = todo.clone();
    changed.apply("B", "b", true);
    repository.save(changed).await.expect("failed to save");
    assert!(repository.delete(&todo.id).await.expect("failed to delete"));

    let history = queries
        .get_change_history(&todo.id_hex())
        .await
        .expect("failed to query");
    let ops: Vec<_> = history.iter().map(|e| e.operation).collect();
    assert_eq!(
        ops,
        vec![OperationType::Create, OperationType::Update, OperationType::Delete]
    );

    let stored = events
        .find_by_id(&history[0].id.expect("id assigned"))
        .await
        .expect("failed to find event");
    assert_eq!(stored.as_ref(), Some(&history[0]));

    assert_eq!(events.delete_all().await.expect("failed to clear"), 3);
    store.shutdown().await;
}
