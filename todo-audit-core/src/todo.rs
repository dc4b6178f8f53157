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

//! The Todo resource and its raw document form.
//!
//! A [`Todo`] is the mutable resource tracked by the service. It is stored as
//! a BSON [`Document`] with the fields `_id`, `uid`, `title`, `content`,
//! `completed`, `createdAt` and `updatedAt`. Conversions in both directions
//! live here so every backend and the delete path of the change capture agree
//! on the same layout.
//!
//! # Example
//!
//! ```rust
//! use todo_audit_core::todo::Todo;
//! use bson::oid::ObjectId;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let todo = Todo::new(ObjectId::new(), "user-1", "Title", "Body", false, now, now);
//!
//! let doc = todo.to_document();
//! let back = Todo::try_from(doc).unwrap();
//! assert_eq!(back.uid, "user-1");
//! ```

use bson::document::{ValueAccessError, ValueAccessResult};
use bson::oid::ObjectId;
use bson::Document;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

/// Field names of a stored Todo document.
pub mod fields {
    /// Document identifier.
    pub const ID: &str = "_id";
    /// Owning user.
    pub const UID: &str = "uid";
    /// Title text.
    pub const TITLE: &str = "title";
    /// Body text.
    pub const CONTENT: &str = "content";
    /// Completion flag.
    pub const COMPLETED: &str = "completed";
    /// Creation timestamp.
    pub const CREATED_AT: &str = "createdAt";
    /// Last modification timestamp.
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Returns the current time truncated to millisecond precision.
///
/// BSON dates only carry milliseconds. Truncating up front keeps the
/// `createdAt == updatedAt` comparison identical whether a Todo was read back
/// from `MongoDB` or kept in memory.
#[must_use]
pub fn audit_timestamp() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

/// Returns an audit timestamp strictly later than `previous`.
///
/// Two writes inside the same millisecond would otherwise share a
/// timestamp, and a modified Todo would look untouched.
#[must_use]
pub fn next_audit_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    audit_timestamp().max(truncate_to_millis(previous) + TimeDelta::milliseconds(1))
}

/// Truncates a timestamp to millisecond precision.
#[must_use]
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// A Todo as committed to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    /// System-generated identifier, immutable after creation.
    pub id: ObjectId,

    /// Owning user, immutable after creation.
    pub uid: String,

    /// Title text
    pub title: String,

    /// Body text
    pub content: String,

    /// Completion flag
    pub completed: bool,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// Set at creation and refreshed on every save
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Creates a Todo with every field given explicitly.
    ///
    /// The repository assigns ids and timestamps for real writes; this
    /// constructor exists for loading and for test setup.
    #[must_use]
    pub fn new(
        id: ObjectId,
        uid: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            uid: uid.into(),
            title: title.into(),
            content: content.into(),
            completed,
            created_at,
            updated_at,
        }
    }

    /// Returns the id as a 24 character hex string.
    #[must_use]
    pub fn id_hex(&self) -> String {
        self.id.to_hex()
    }

    /// Applies new content. `updated_at` is left to the repository's auditing.
    pub fn apply(&mut self, title: impl Into<String>, content: impl Into<String>, completed: bool) {
        self.title = title.into();
        self.content = content.into();
        self.completed = completed;
    }

    /// Returns true if the Todo has never been modified since creation.
    #[inline]
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.updated_at == self.created_at
    }

    /// Converts the Todo into its stored document form.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::ID, self.id);
        doc.insert(fields::UID, self.uid.as_str());
        doc.insert(fields::TITLE, self.title.as_str());
        doc.insert(fields::CONTENT, self.content.as_str());
        doc.insert(fields::COMPLETED, self.completed);
        doc.insert(fields::CREATED_AT, bson::DateTime::from_chrono(self.created_at));
        doc.insert(fields::UPDATED_AT, bson::DateTime::from_chrono(self.updated_at));
        doc
    }
}

impl TryFrom<&Document> for Todo {
    type Error = DocumentError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: required(fields::ID, doc.get_object_id(fields::ID))?,
            uid: required(fields::UID, doc.get_str(fields::UID))?.to_string(),
            title: required(fields::TITLE, doc.get_str(fields::TITLE))?.to_string(),
            content: required(fields::CONTENT, doc.get_str(fields::CONTENT))?.to_string(),
            completed: required(fields::COMPLETED, doc.get_bool(fields::COMPLETED))?,
            created_at: required(fields::CREATED_AT, doc.get_datetime(fields::CREATED_AT))?
                .to_chrono(),
            updated_at: required(fields::UPDATED_AT, doc.get_datetime(fields::UPDATED_AT))?
                .to_chrono(),
        })
    }
}

impl TryFrom<Document> for Todo {
    type Error = DocumentError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        Self::try_from(&doc)
    }
}

/// Input for creating a Todo. Ids and timestamps are assigned on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    /// Owning user
    pub uid: String,
    /// Title text
    pub title: String,
    /// Body text
    pub content: String,
    /// Completion flag, false unless given
    pub completed: bool,
}

impl NewTodo {
    /// Creates a new, not yet completed Todo input.
    #[must_use]
    pub fn new(
        uid: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            content: content.into(),
            completed: false,
        }
    }

    /// Sets the completion flag.
    #[must_use]
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Materializes the Todo with a fresh id and both timestamps set to `at`.
    #[must_use]
    pub fn into_todo(self, id: ObjectId, at: DateTime<Utc>) -> Todo {
        Todo::new(id, self.uid, self.title, self.content, self.completed, at, at)
    }
}

/// Why a raw document field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The field is absent
    Missing,
    /// The field is present with a different BSON type
    UnexpectedType,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "is missing"),
            Self::UnexpectedType => write!(f, "has an unexpected type"),
        }
    }
}

/// A raw document could not be decoded into a typed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document field `{field}` {kind}")]
pub struct DocumentError {
    /// Name of the offending field
    pub field: String,
    /// What was wrong with it
    pub kind: FieldErrorKind,
}

impl DocumentError {
    /// Creates a new document error.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Attaches the field name to a BSON accessor result.
pub(crate) fn required<T>(field: &str, result: ValueAccessResult<T>) -> Result<T, DocumentError> {
    result.map_err(|e| {
        let kind = match e {
            ValueAccessError::NotPresent => FieldErrorKind::Missing,
            _ => FieldErrorKind::UnexpectedType,
        };
        DocumentError::new(field, kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Todo {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap();
        Todo::new(ObjectId::new(), "u1", "Groceries", "Milk", true, created, updated)
    }

    #[test]
    fn test_next_audit_timestamp_is_strictly_later() {
        let now = audit_timestamp();
        assert!(next_audit_timestamp(now) > now);

        let ahead = now + TimeDelta::seconds(60);
        assert_eq!(next_audit_timestamp(ahead), ahead + TimeDelta::milliseconds(1));
    }

    #[test]
    fn test_document_round_trip_keeps_fields() {
        let todo = sample();
        let doc = todo.to_document();

        assert_eq!(doc.get_str("uid").unwrap(), "u1");
        assert_eq!(doc.get_object_id("_id").unwrap(), todo.id);
        assert_eq!(Todo::try_from(doc).unwrap(), todo);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let mut doc = sample().to_document();
        doc.remove("content");

        let err = Todo::try_from(&doc).unwrap_err();
        assert_eq!(err.field, "content");
        assert_eq!(err.kind, FieldErrorKind::Missing);
    }

    #[test]
    fn test_mistyped_field_is_reported() {
        let mut doc = sample().to_document();
        doc.insert("completed", "yes");

        let err = Todo::try_from(&doc).unwrap_err();
        assert_eq!(err.field, "completed");
        assert_eq!(err.kind, FieldErrorKind::UnexpectedType);
        assert_eq!(
            err.to_string(),
            "document field `completed` has an unexpected type"
        );
    }

    #[test]
    fn test_new_todo_has_equal_timestamps() {
        let at = audit_timestamp();
        let todo = NewTodo::new("u1", "t", "c").into_todo(ObjectId::new(), at);

        assert!(todo.is_pristine());
        assert!(!todo.completed);
    }

    #[test]
    fn test_apply_leaves_timestamps_alone() {
        let mut todo = sample();
        let before = todo.updated_at;
        todo.apply("New", "Body", false);

        assert_eq!(todo.title, "New");
        assert_eq!(todo.updated_at, before);
    }

    #[test]
    fn test_truncate_to_millis() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let truncated = truncate_to_millis(at);
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_000_000);
    }
}
