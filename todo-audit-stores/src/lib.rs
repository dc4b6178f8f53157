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

//! Store implementations for the Todo audit service.
//!
//! This crate provides backend implementations of the
//! [`TodoStore`](todo_audit_core::store::TodoStore) and
//! [`ChangeEventStore`](todo_audit_core::store::ChangeEventStore) traits.
//!
//! # Available Stores
//!
//! - **Memory** (always available): process-local storage for development
//!   and tests
//! - **`MongoDB`** (`mongodb-store` feature, default): pooled driver client
//!   with the `todos` and `todo_change_events` collections
//!
//! # Feature Flags
//!
//! - `mongodb-store`: Enables the `MongoDB` backend (requires a server)
//!
//! # Example: MongoDB Store
//!
//! ```rust,ignore
//! use todo_audit_stores::mongodb::{MongoConfig, MongoStore};
//! use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
//! use todo_audit_core::repository::TodoRepository;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MongoStore::connect(MongoConfig::builder().build()?).await?;
//! store.ensure_indexes().await?;
//!
//! let capture = ChangeCapture::new(
//!     Arc::new(store.change_event_store()),
//!     CaptureConfig::default(),
//! );
//! let repository = TodoRepository::new(Arc::new(store.todo_store()))
//!     .with_listener(Arc::new(capture));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod memory;

#[cfg(feature = "mongodb-store")]
pub mod mongodb;
