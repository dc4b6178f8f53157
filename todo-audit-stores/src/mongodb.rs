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

//! `MongoDB` store implementations.
//!
//! [`MongoStore`] owns a pooled driver client and hands out
//! [`MongoTodoStore`] and [`MongoChangeEventStore`], both backed by the same
//! database. The driver manages the connection pool; stores are cheap to
//! clone and safe to share across request handlers.
//!
//! # Collections
//!
//! ```text
//! todos               { _id, uid, title, content, completed, createdAt, updatedAt }
//! todo_change_events  { _id, todoId, uid, operationType, title, content,
//!                       completed, createdAt, todoCreatedAt, todoUpdatedAt }
//! ```
//!
//! [`MongoStore::ensure_indexes`] creates a unique `{uid: 1, createdAt: 1}`
//! index named `idx__uid__createdAt` and an `updatedAt` index on `todos`,
//! and `todoId` and `uid` indexes on `todo_change_events`.
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_audit_stores::mongodb::{MongoConfig, MongoStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MongoConfig::builder()
//!     .uri("mongodb://localhost:27017")
//!     .database("todo")
//!     .max_pool_size(50)
//!     .build()?;
//!
//! let store = MongoStore::connect(config).await?;
//! store.ensure_indexes().await?;
//!
//! let todos = store.todo_store();
//! let events = store.change_event_store();
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::TryStreamExt;
use ::mongodb::error::{ErrorKind, WriteFailure};
use ::mongodb::options::{ClientOptions, IndexOptions};
use ::mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;
use todo_audit_core::event::ChangeEvent;
use todo_audit_core::store::{ChangeEventStore, StoreError, TodoStore};
use todo_audit_core::todo::Todo;
use tracing::{debug, error, info};

/// Collection holding Todos.
pub const TODOS_COLLECTION: &str = "todos";

/// Collection holding change events.
pub const CHANGE_EVENTS_COLLECTION: &str = "todo_change_events";

/// Name of the unique `(uid, createdAt)` index on Todos.
pub const UID_CREATED_AT_INDEX: &str = "idx__uid__createdAt";

/// `MongoDB` server error code for duplicate keys.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Configuration for the `MongoDB` backend.
///
/// Use [`MongoConfigBuilder`] to construct this configuration with validation.
///
/// # Example
///
/// ```rust
/// use todo_audit_stores::mongodb::MongoConfig;
/// use std::time::Duration;
///
/// let config = MongoConfig::builder()
///     .uri("mongodb://localhost:27017")
///     .database("todo")
///     .connect_timeout(Duration::from_secs(5))
///     .build()
///     .expect("valid config");
/// ```
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string (e.g., "mongodb://localhost:27017")
    pub uri: String,

    /// Database holding both collections (default: "todo")
    pub database: String,

    /// Maximum pooled connections per server (default: 100)
    pub max_pool_size: u32,

    /// Connections kept open while idle (default: 10)
    pub min_pool_size: u32,

    /// How long a pooled connection may stay idle (default: 10 minutes)
    pub max_idle_time: Duration,

    /// TCP connect timeout (default: 2 seconds)
    pub connect_timeout: Duration,

    /// How long an operation waits for a suitable server (default: 2 seconds)
    pub server_selection_timeout: Duration,

    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "todo".to_string(),
            max_pool_size: 100,
            min_pool_size: 10,
            max_idle_time: Duration::from_secs(10 * 60),
            connect_timeout: Duration::from_secs(2),
            server_selection_timeout: Duration::from_secs(2),
            app_name: Some("todo-audit".to_string()),
        }
    }
}

impl MongoConfig {
    /// Creates a new builder for `MongoConfig`.
    #[must_use]
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::default()
    }
}

/// Builder for [`MongoConfig`] with validation.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    max_pool_size: Option<u32>,
    min_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    app_name: Option<String>,
}

impl MongoConfigBuilder {
    /// Sets the connection string.
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the maximum pool size.
    #[must_use]
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Sets the minimum pool size.
    #[must_use]
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Sets the maximum idle time of pooled connections.
    #[must_use]
    pub fn max_idle_time(mut self, idle: Duration) -> Self {
        self.max_idle_time = Some(idle);
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the server selection timeout.
    #[must_use]
    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    /// Sets the application name reported to the server.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Builds the `MongoConfig`, filling unset values with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URI does not start with `mongodb://` or `mongodb+srv://`
    /// - The database name is empty
    /// - `max_pool_size` is 0 or smaller than `min_pool_size`
    pub fn build(self) -> Result<MongoConfig, StoreError> {
        let defaults = MongoConfig::default();

        let uri = self.uri.unwrap_or(defaults.uri);
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(StoreError::Other(format!(
                "MongoDB URI must start with mongodb:// or mongodb+srv://, got {uri}"
            )));
        }

        let database = self.database.unwrap_or(defaults.database);
        if database.trim().is_empty() {
            return Err(StoreError::Other("Database name is required".to_string()));
        }

        let max_pool_size = self.max_pool_size.unwrap_or(defaults.max_pool_size);
        let min_pool_size = self.min_pool_size.unwrap_or(defaults.min_pool_size);
        if max_pool_size == 0 {
            return Err(StoreError::Other(
                "Pool size must be greater than 0".to_string(),
            ));
        }
        if min_pool_size > max_pool_size {
            return Err(StoreError::Other(format!(
                "min_pool_size ({min_pool_size}) must not exceed max_pool_size ({max_pool_size})"
            )));
        }

        Ok(MongoConfig {
            uri,
            database,
            max_pool_size,
            min_pool_size,
            max_idle_time: self.max_idle_time.unwrap_or(defaults.max_idle_time),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .unwrap_or(defaults.server_selection_timeout),
            app_name: self.app_name.or(defaults.app_name),
        })
    }
}

/// Maps a driver error onto a [`StoreError`].
fn map_error(err: ::mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            StoreError::DuplicateKey(write_error.message.clone())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            StoreError::DuplicateKey(command_error.message.clone())
        }
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StoreError::Connection(err.to_string()),
        ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
            StoreError::Serialization(err.to_string())
        }
        _ => StoreError::Other(err.to_string()),
    }
}

/// Pooled `MongoDB` client serving both stores.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.database.name())
            .finish_non_exhaustive()
    }
}

impl MongoStore {
    /// Connects to `MongoDB` and verifies the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URI cannot be parsed or the
    /// server does not answer.
    pub async fn connect(config: MongoConfig) -> Result<Self, StoreError> {
        debug!(
            database = %config.database,
            max_pool_size = config.max_pool_size,
            min_pool_size = config.min_pool_size,
            "Initializing MongoDB store"
        );

        let mut options = ClientOptions::parse(&config.uri).await.map_err(|e| {
            error!(error = %e, "Failed to parse MongoDB URI");
            StoreError::Connection(format!("Invalid MongoDB URI: {e}"))
        })?;
        options.max_pool_size = Some(config.max_pool_size);
        options.min_pool_size = Some(config.min_pool_size);
        options.max_idle_time = Some(config.max_idle_time);
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);
        options.app_name.clone_from(&config.app_name);

        let client = Client::with_options(options).map_err(|e| {
            error!(error = %e, "Failed to create MongoDB client");
            StoreError::Connection(format!("Failed to create client: {e}"))
        })?;
        let database = client.database(&config.database);

        database.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            error!(error = %e, "MongoDB ping failed");
            StoreError::Connection(format!("MongoDB connection test failed: {e}"))
        })?;

        info!(database = %config.database, "Connected to MongoDB");
        Ok(Self { client, database })
    }

    /// Creates the indexes both collections rely on. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if index creation fails, for example because existing
    /// Todos violate the unique `(uid, createdAt)` constraint.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let todos = self.database.collection::<Document>(TODOS_COLLECTION);
        todos
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "uid": 1, "createdAt": 1 })
                    .options(
                        IndexOptions::builder()
                            .name(UID_CREATED_AT_INDEX.to_string())
                            .unique(true)
                            .build(),
                    )
                    .build(),
                IndexModel::builder().keys(doc! { "updatedAt": 1 }).build(),
            ])
            .await
            .map_err(map_error)?;

        let events = self.database.collection::<Document>(CHANGE_EVENTS_COLLECTION);
        events
            .create_indexes([
                IndexModel::builder().keys(doc! { "todoId": 1 }).build(),
                IndexModel::builder().keys(doc! { "uid": 1 }).build(),
            ])
            .await
            .map_err(map_error)?;

        info!("Ensured MongoDB indexes");
        Ok(())
    }

    /// Returns the Todo store.
    #[must_use]
    pub fn todo_store(&self) -> MongoTodoStore {
        MongoTodoStore {
            collection: self.database.collection(TODOS_COLLECTION),
        }
    }

    /// Returns the change event store.
    #[must_use]
    pub fn change_event_store(&self) -> MongoChangeEventStore {
        MongoChangeEventStore {
            collection: self.database.collection(CHANGE_EVENTS_COLLECTION),
        }
    }

    /// Shuts the client down, waiting for in-flight operations.
    pub async fn shutdown(self) {
        debug!("Shutting down MongoDB client");
        self.client.shutdown().await;
    }
}

/// Todo store backed by the `todos` collection.
#[derive(Debug, Clone)]
pub struct MongoTodoStore {
    collection: Collection<Document>,
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), StoreError> {
        self.collection
            .insert_one(todo.to_document())
            .await
            .map_err(map_error)?;
        debug!(todo_id = %todo.id, "Inserted todo into MongoDB");
        Ok(())
    }

    async fn replace(&self, todo: &Todo) -> Result<bool, StoreError> {
        let result = self
            .collection
            .replace_one(doc! { "_id": todo.id }, todo.to_document())
            .await
            .map_err(map_error)?;
        debug!(
            todo_id = %todo.id,
            matched = result.matched_count,
            "Replaced todo in MongoDB"
        );
        Ok(result.matched_count > 0)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Todo>, StoreError> {
        let doc = self
            .collection
            .find_one(doc! { "_id": *id })
            .await
            .map_err(map_error)?;
        doc.map(|d| Todo::try_from(d).map_err(StoreError::from))
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<Todo>, StoreError> {
        let docs: Vec<Document> = self
            .collection
            .find(doc! {})
            .await
            .map_err(map_error)?
            .try_collect()
            .await
            .map_err(map_error)?;
        docs.into_iter()
            .map(|d| Todo::try_from(d).map_err(StoreError::from))
            .collect()
    }

    async fn delete(&self, id: &ObjectId) -> Result<Option<Document>, StoreError> {
        let removed = self
            .collection
            .find_one_and_delete(doc! { "_id": *id })
            .await
            .map_err(map_error)?;
        if removed.is_some() {
            debug!(todo_id = %id, "Deleted todo from MongoDB");
        }
        Ok(removed)
    }
}

/// Change event store backed by the `todo_change_events` collection.
#[derive(Debug, Clone)]
pub struct MongoChangeEventStore {
    collection: Collection<Document>,
}

impl MongoChangeEventStore {
    async fn find_many(&self, filter: Document) -> Result<Vec<ChangeEvent>, StoreError> {
        let docs: Vec<Document> = self
            .collection
            .find(filter)
            .await
            .map_err(map_error)?
            .try_collect()
            .await
            .map_err(map_error)?;
        docs.into_iter()
            .map(|d| ChangeEvent::try_from(d).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl ChangeEventStore for MongoChangeEventStore {
    async fn insert(&self, event: ChangeEvent) -> Result<ChangeEvent, StoreError> {
        let event = match event.id {
            Some(_) => event,
            None => event.with_id(ObjectId::new()),
        };
        self.collection
            .insert_one(event.to_document())
            .await
            .map_err(map_error)?;
        debug!(
            todo_id = %event.todo_id,
            operation = %event.operation,
            "Inserted change event into MongoDB"
        );
        Ok(event)
    }

    async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError> {
        self.find_many(doc! {}).await
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError> {
        let doc = self
            .collection
            .find_one(doc! { "_id": *id })
            .await
            .map_err(map_error)?;
        doc.map(|d| ChangeEvent::try_from(d).map_err(StoreError::from))
            .transpose()
    }

    async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        self.find_many(doc! { "todoId": todo_id }).await
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError> {
        self.find_many(doc! { "uid": uid }).await
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = self
            .collection
            .delete_many(doc! {})
            .await
            .map_err(map_error)?;
        debug!(deleted = result.deleted_count, "Deleted all change events");
        Ok(result.deleted_count)
    }
}
