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

//! Audit trail over the in-memory stores.
//!
//! Creates, edits and deletes a Todo, then prints its change history. No
//! database required.
//!
//! # Running the Example
//!
//! ```bash
//! cargo run -p todo-audit-stores --example memory_audit_trail
//! ```

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
use todo_audit_core::query::ChangeEventQueryService;
use todo_audit_core::repository::TodoRepository;
use todo_audit_core::todo::NewTodo;
use todo_audit_stores::memory::{MemoryChangeEventStore, MemoryTodoStore};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,todo_audit_core=debug")),
        )
        .init();

    let events = Arc::new(MemoryChangeEventStore::new());
    let repository = TodoRepository::new(Arc::new(MemoryTodoStore::new())).with_listener(
        Arc::new(ChangeCapture::new(events.clone(), CaptureConfig::default())),
    );
    let queries = ChangeEventQueryService::new(events);

    let todo = repository
        .create(NewTodo::new("demo-user", "Water plants", "Balcony first"))
        .await?;
    info!(todo_id = %todo.id, "Created");

    // Keep the edit in a later millisecond than the creation
    tokio::time::sleep(Duration::from_millis(2)).await;
    let mut edited = todo.clone();
    edited.apply("Water plants", "Balcony and kitchen", true);
    repository.save(edited).await?;

    repository.delete(&todo.id).await?;

    for event in queries.get_change_history(&todo.id_hex()).await? {
        info!(
            operation = %event.operation,
            title = %event.title,
            content = %event.content,
            completed = event.completed,
            recorded_at = %event.created_at,
            "History entry"
        );
    }

    Ok(())
}
