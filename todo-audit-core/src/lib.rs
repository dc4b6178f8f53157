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

//! Todo Audit Core - Todo persistence with an in-process change capture hook
//!
//! This crate provides the domain types, storage seams and services of the
//! Todo audit service. Every committed Todo write or delete is turned into an
//! immutable change event by a lifecycle listener, giving a queryable audit
//! trail without an external streaming component.
//!
//! # Key Components
//!
//! - **Todos**: [`todo`] defines the resource and its document layout
//! - **Events**: [`event`] defines change events and operation types
//! - **Stores**: [`store`] defines the storage traits backends implement
//! - **Repository**: [`repository`] audits timestamps and fires lifecycle events
//! - **Capture**: [`capture`] records a change event per lifecycle event
//! - **Services**: [`service`] (CRUD) and [`query`] (audit log reads)
//!
//! # Example
//!
//! ```rust
//! use todo_audit_core::event::{ChangeEvent, OperationType};
//!
//! fn describe(event: &ChangeEvent) -> &'static str {
//!     match event.operation {
//!         OperationType::Create => "created",
//!         OperationType::Update => "updated",
//!         OperationType::Delete => "deleted",
//!     }
//! }
//! ```

pub mod capture;
pub mod event;
pub mod lifecycle;
pub mod metrics;
pub mod query;
pub mod repository;
pub mod service;
pub mod store;
pub mod todo;
