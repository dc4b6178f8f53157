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

//! Persistence lifecycle notifications.
//!
//! The repository fires a [`LifecycleEvent`] synchronously, in-process, right
//! after the store commits a Todo write or delete. Listeners are registered
//! explicitly on the repository; there is no global registry.
//!
//! ```text
//! TodoRepository::save ──► TodoStore::replace ──► LifecycleEvent::Saved(todo)
//!                                                      │
//! TodoRepository::delete ─► TodoStore::delete ──► LifecycleEvent::Deleted(raw)
//!                                                      │
//!                                                      ▼
//!                                       LifecycleListener::on_event
//! ```

use crate::capture::CaptureError;
use crate::todo::Todo;
use async_trait::async_trait;
use bson::Document;

/// A notification fired after a Todo mutation is durably applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A Todo was inserted or replaced; carries the entity as committed.
    Saved(Todo),

    /// A Todo was removed; carries the raw document as it existed in storage
    /// immediately before removal. The typed entity is not available here.
    Deleted(Document),
}

impl LifecycleEvent {
    /// Returns a short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Saved(_) => "saved",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Receives lifecycle notifications for Todo documents.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    /// Handles one notification.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if the listener could not complete its side
    /// effect. The Todo mutation has already been committed at this point.
    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), CaptureError>;
}
