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

//! Application state shared across HTTP handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
use todo_audit_core::query::ChangeEventQueryService;
use todo_audit_core::repository::{CaptureFailurePolicy, TodoRepository};
use todo_audit_core::service::TodoService;
use todo_audit_core::store::{ChangeEventStore, TodoStore};
use todo_audit_stores::memory::{MemoryChangeEventStore, MemoryTodoStore};

/// Services reachable from every handler.
#[derive(Clone)]
pub struct AppState {
    /// Todo CRUD
    pub todos: TodoService,
    /// Change event reads
    pub changes: ChangeEventQueryService,
    /// Prometheus renderer, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires the services over the given stores, with change capture
    /// registered on the Todo repository.
    #[must_use]
    pub fn new(
        todo_store: Arc<dyn TodoStore>,
        event_store: Arc<dyn ChangeEventStore>,
        capture: CaptureConfig,
        failure_policy: CaptureFailurePolicy,
    ) -> Self {
        let listener = ChangeCapture::new(Arc::clone(&event_store), capture);
        let repository = TodoRepository::new(todo_store)
            .with_listener(Arc::new(listener))
            .with_failure_policy(failure_policy);

        Self {
            todos: TodoService::new(repository),
            changes: ChangeEventQueryService::new(event_store),
            metrics: None,
        }
    }

    /// State over fresh in-memory stores with default capture settings.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTodoStore::new()),
            Arc::new(MemoryChangeEventStore::new()),
            CaptureConfig::default(),
            CaptureFailurePolicy::default(),
        )
    }

    /// Enables the `/metrics` endpoint.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
