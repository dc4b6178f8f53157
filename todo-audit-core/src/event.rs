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

//! Change Event Representation
//!
//! A [`ChangeEvent`] is the immutable audit record written once per Todo
//! mutation. It carries a full snapshot of the Todo's fields at the moment of
//! the change, not a diff, and has no live relationship to the Todo: it stays
//! valid and queryable after the Todo is deleted.
//!
//! # Examples
//!
//! ```rust
//! use todo_audit_core::event::{ChangeEvent, OperationType};
//! use todo_audit_core::todo::Todo;
//! use bson::oid::ObjectId;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let todo = Todo::new(ObjectId::new(), "user-1", "Write docs", "", false, now, now);
//!
//! let event = ChangeEvent::from_saved(&todo, Utc::now());
//! assert_eq!(event.operation, OperationType::Create);
//! assert_eq!(event.todo_id, todo.id_hex());
//! assert!(event.id.is_none()); // assigned by the event store
//! ```

use crate::todo::{self, required, DocumentError, Todo};
use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field names of a stored change event document.
pub mod fields {
    /// Event identifier.
    pub const ID: &str = "_id";
    /// Hex id of the Todo that changed.
    pub const TODO_ID: &str = "todoId";
    /// Owning user of the Todo.
    pub const UID: &str = "uid";
    /// Kind of change.
    pub const OPERATION_TYPE: &str = "operationType";
    /// Title snapshot.
    pub const TITLE: &str = "title";
    /// Content snapshot.
    pub const CONTENT: &str = "content";
    /// Completion snapshot.
    pub const COMPLETED: &str = "completed";
    /// When the event was recorded.
    pub const CREATED_AT: &str = "createdAt";
    /// The Todo's own creation timestamp.
    pub const TODO_CREATED_AT: &str = "todoCreatedAt";
    /// The Todo's own modification timestamp.
    pub const TODO_UPDATED_AT: &str = "todoUpdatedAt";
}

/// Kind of mutation a change event records.
///
/// This is a closed set; events are only ever created, updated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    /// The Todo was created
    Create,

    /// The Todo was modified
    Update,

    /// The Todo was removed
    Delete,
}

impl OperationType {
    /// All operation types, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Create, Self::Update, Self::Delete];

    /// Classifies a committed write.
    ///
    /// A Todo whose `updated_at` equals its `created_at` is treated as just
    /// created; anything else is an update. This conflates "never modified"
    /// with "just created": a save that leaves `updated_at` equal to
    /// `created_at` is reported as [`OperationType::Create`].
    #[inline]
    #[must_use]
    pub fn classify(todo: &Todo) -> Self {
        if todo.updated_at == todo.created_at {
            Self::Create
        } else {
            Self::Update
        }
    }

    /// Returns the wire name (`CREATE`, `UPDATE`, `DELETE`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation name that is not one of `CREATE`, `UPDATE` or `DELETE`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation type `{0}`, expected one of CREATE, UPDATE, DELETE")]
pub struct UnknownOperationType(pub String);

impl FromStr for OperationType {
    type Err = UnknownOperationType;

    /// Parses an operation name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOperationType(s.to_string()))
    }
}

/// An immutable audit record of one Todo mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Event identifier, `None` until the event store assigns one
    pub id: Option<ObjectId>,

    /// Hex id of the Todo that changed. Not a live reference.
    pub todo_id: String,

    /// Owning user of the Todo at the time of the change
    pub uid: String,

    /// Kind of change
    pub operation: OperationType,

    /// Title at the moment of the change
    pub title: String,

    /// Content at the moment of the change
    pub content: String,

    /// Completion flag at the moment of the change
    pub completed: bool,

    /// When this event itself was recorded
    pub created_at: DateTime<Utc>,

    /// Copy of the Todo's creation timestamp
    pub todo_created_at: DateTime<Utc>,

    /// Copy of the Todo's modification timestamp
    pub todo_updated_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Builds the event for a committed write, classified with
    /// [`OperationType::classify`].
    #[must_use]
    pub fn from_saved(todo: &Todo, recorded_at: DateTime<Utc>) -> Self {
        Self::snapshot(todo, OperationType::classify(todo), recorded_at)
    }

    /// Builds a `DELETE` event from the raw document as it existed in storage
    /// right before removal.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if any of `_id`, `uid`, `title`, `content`,
    /// `completed`, `createdAt` or `updatedAt` is missing or has an unexpected
    /// type. No event is built in that case.
    pub fn from_deleted(raw: &Document, recorded_at: DateTime<Utc>) -> Result<Self, DocumentError> {
        let todo = Todo::try_from(raw)?;
        Ok(Self::snapshot(&todo, OperationType::Delete, recorded_at))
    }

    /// Copies the Todo's fields 1:1 into a new event.
    #[must_use]
    pub fn snapshot(todo: &Todo, operation: OperationType, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            todo_id: todo.id_hex(),
            uid: todo.uid.clone(),
            operation,
            title: todo.title.clone(),
            content: todo.content.clone(),
            completed: todo.completed,
            created_at: recorded_at,
            todo_created_at: todo.created_at,
            todo_updated_at: todo.updated_at,
        }
    }

    /// Returns a copy of this event carrying the given id.
    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns true if this is a create event.
    #[inline]
    pub fn is_create(&self) -> bool {
        self.operation == OperationType::Create
    }

    /// Returns true if this is an update event.
    #[inline]
    pub fn is_update(&self) -> bool {
        self.operation == OperationType::Update
    }

    /// Returns true if this is a delete event.
    #[inline]
    pub fn is_delete(&self) -> bool {
        self.operation == OperationType::Delete
    }

    /// Converts the event into its stored document form.
    ///
    /// `_id` is only written when the event already has one.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert(fields::ID, id);
        }
        doc.insert(fields::TODO_ID, self.todo_id.as_str());
        doc.insert(fields::UID, self.uid.as_str());
        doc.insert(fields::OPERATION_TYPE, self.operation.as_str());
        doc.insert(fields::TITLE, self.title.as_str());
        doc.insert(fields::CONTENT, self.content.as_str());
        doc.insert(fields::COMPLETED, self.completed);
        doc.insert(fields::CREATED_AT, bson::DateTime::from_chrono(self.created_at));
        doc.insert(
            fields::TODO_CREATED_AT,
            bson::DateTime::from_chrono(self.todo_created_at),
        );
        doc.insert(
            fields::TODO_UPDATED_AT,
            bson::DateTime::from_chrono(self.todo_updated_at),
        );
        doc
    }
}

/// Conversion from a stored event document.
impl TryFrom<&Document> for ChangeEvent {
    type Error = DocumentError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        let operation = required(fields::OPERATION_TYPE, doc.get_str(fields::OPERATION_TYPE))?
            .parse::<OperationType>()
            .map_err(|_| {
                DocumentError::new(fields::OPERATION_TYPE, todo::FieldErrorKind::UnexpectedType)
            })?;

        Ok(Self {
            id: Some(required(fields::ID, doc.get_object_id(fields::ID))?),
            todo_id: required(fields::TODO_ID, doc.get_str(fields::TODO_ID))?.to_string(),
            uid: required(fields::UID, doc.get_str(fields::UID))?.to_string(),
            operation,
            title: required(fields::TITLE, doc.get_str(fields::TITLE))?.to_string(),
            content: required(fields::CONTENT, doc.get_str(fields::CONTENT))?.to_string(),
            completed: required(fields::COMPLETED, doc.get_bool(fields::COMPLETED))?,
            created_at: required(fields::CREATED_AT, doc.get_datetime(fields::CREATED_AT))?
                .to_chrono(),
            todo_created_at: required(
                fields::TODO_CREATED_AT,
                doc.get_datetime(fields::TODO_CREATED_AT),
            )?
            .to_chrono(),
            todo_updated_at: required(
                fields::TODO_UPDATED_AT,
                doc.get_datetime(fields::TODO_UPDATED_AT),
            )?
            .to_chrono(),
        })
    }
}

impl TryFrom<Document> for ChangeEvent {
    type Error = DocumentError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        Self::try_from(&doc)
    }
}
