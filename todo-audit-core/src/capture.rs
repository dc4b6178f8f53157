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

//! Change capture: the lifecycle listener that writes the audit trail.
//!
//! [`ChangeCapture`] turns every [`LifecycleEvent`] into exactly one
//! [`ChangeEvent`] and inserts it into a [`ChangeEventStore`]:
//!
//! - **Saved**: the committed Todo is copied field by field and classified
//!   with [`OperationType::classify`] (`updatedAt == createdAt` → CREATE,
//!   otherwise UPDATE).
//! - **Deleted**: the raw pre-delete document is decoded field by field. A
//!   missing or mistyped field is a [`CaptureError::Decode`] and no event is
//!   written.
//!
//! Inserts are retried with exponential backoff for retryable store errors.
//! When every attempt fails the result is a [`CaptureError::Persist`]; the
//! Todo mutation that triggered it has already been committed, so the caller
//! decides whether that audit gap is surfaced (see
//! [`CaptureFailurePolicy`](crate::repository::CaptureFailurePolicy)).
//!
//! # Example
//!
//! ```rust,ignore
//! use todo_audit_core::capture::{CaptureConfig, ChangeCapture};
//! use todo_audit_core::repository::TodoRepository;
//! use std::sync::Arc;
//!
//! let events = Arc::new(MemoryChangeEventStore::new());
//! let capture = ChangeCapture::new(events.clone(), CaptureConfig::default());
//!
//! let repository = TodoRepository::new(Arc::new(MemoryTodoStore::new()))
//!     .with_listener(Arc::new(capture));
//! ```

use crate::event::ChangeEvent;
use crate::lifecycle::{LifecycleEvent, LifecycleListener};
use crate::metrics::{self, ErrorCategory, Timer};
use crate::store::{ChangeEventStore, StoreError};
use crate::todo::{audit_timestamp, DocumentError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors raised while capturing a change event.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The raw pre-delete document could not be decoded into an event.
    #[error("Cannot build change event: {0}")]
    Decode(#[from] DocumentError),

    /// The event could not be persisted; this is an audit gap.
    #[error("Failed to persist change event for todo {todo_id} after {attempts} attempt(s): {source}")]
    Persist {
        /// Hex id of the Todo whose event was lost
        todo_id: String,
        /// How many inserts were attempted
        attempts: u32,
        /// Last store error
        #[source]
        source: StoreError,
    },
}

impl CaptureError {
    /// Returns the metrics category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Serialization,
            Self::Persist { source, .. } => source.category(),
        }
    }
}

/// Retry settings for change event inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Retries after the first failed insert (0 = single attempt)
    pub max_retries: u32,

    /// Initial retry delay (doubles with each retry)
    pub retry_delay: Duration,

    /// Maximum retry delay
    pub max_retry_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(2),
        }
    }
}

impl CaptureConfig {
    /// Creates a new builder for `CaptureConfig`.
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

/// Builder for `CaptureConfig`.
#[derive(Debug, Default)]
pub struct CaptureConfigBuilder {
    max_retries: Option<u32>,
    retry_delay: Duration,
    max_retry_delay: Duration,
}

impl CaptureConfigBuilder {
    /// Sets the maximum number of retries.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the initial retry delay.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the maximum retry delay.
    #[must_use]
    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Builds the `CaptureConfig`, filling unset values with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_retry_delay` is shorter than `retry_delay`.
    pub fn build(self) -> Result<CaptureConfig, String> {
        let defaults = CaptureConfig::default();

        let retry_delay = if self.retry_delay.is_zero() {
            defaults.retry_delay
        } else {
            self.retry_delay
        };
        let max_retry_delay = if self.max_retry_delay.is_zero() {
            defaults.max_retry_delay.max(retry_delay)
        } else {
            self.max_retry_delay
        };

        if max_retry_delay < retry_delay {
            return Err(format!(
                "max_retry_delay ({max_retry_delay:?}) must not be shorter than retry_delay ({retry_delay:?})"
            ));
        }

        Ok(CaptureConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay,
            max_retry_delay,
        })
    }
}

/// Lifecycle listener that records a [`ChangeEvent`] for every Todo mutation.
pub struct ChangeCapture {
    /// Where events are appended
    store: Arc<dyn ChangeEventStore>,

    /// Retry settings
    config: CaptureConfig,
}

impl ChangeCapture {
    /// Creates a capture hook writing to the given event store.
    #[must_use]
    pub fn new(store: Arc<dyn ChangeEventStore>, config: CaptureConfig) -> Self {
        info!(
            max_retries = config.max_retries,
            retry_delay = ?config.retry_delay,
            "Creating change capture"
        );
        Self { store, config }
    }

    /// Builds the change event for a notification without persisting it.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Decode`] if a deleted document is malformed.
    pub fn build_event(event: &LifecycleEvent) -> Result<ChangeEvent, CaptureError> {
        let recorded_at = audit_timestamp();
        match event {
            LifecycleEvent::Saved(todo) => Ok(ChangeEvent::from_saved(todo, recorded_at)),
            LifecycleEvent::Deleted(raw) => Ok(ChangeEvent::from_deleted(raw, recorded_at)?),
        }
    }

    /// Persists an event with exponential backoff retry.
    async fn persist(&self, event: ChangeEvent) -> Result<ChangeEvent, CaptureError> {
        let mut retry_delay = self.config.retry_delay;
        let mut attempt: u32 = 0;

        loop {
            match self.store.insert(event.clone()).await {
                Ok(stored) => {
                    if attempt > 0 {
                        info!(
                            todo_id = %stored.todo_id,
                            attempts = attempt + 1,
                            "Change event persisted after retries"
                        );
                    }
                    return Ok(stored);
                }
                Err(e) => {
                    attempt += 1;

                    if attempt > self.config.max_retries || !e.is_retryable() {
                        return Err(CaptureError::Persist {
                            todo_id: event.todo_id,
                            attempts: attempt,
                            source: e,
                        });
                    }

                    metrics::increment_capture_retries(e.category());
                    warn!(
                        todo_id = %event.todo_id,
                        attempt,
                        max_retries = self.config.max_retries,
                        retry_delay_ms = retry_delay.as_millis(),
                        error = %e,
                        "Change event insert failed, retrying"
                    );

                    tokio::time::sleep(retry_delay).await;
                    retry_delay = std::cmp::min(retry_delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }
}

#[async_trait]
impl LifecycleListener for ChangeCapture {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<(), CaptureError> {
        let _timer = Timer::new(event.kind(), |duration, kind| {
            metrics::record_capture_duration(duration, kind);
        });

        let result = match Self::build_event(event) {
            Ok(change) => self.persist(change).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(stored) => {
                metrics::increment_events_recorded(stored.operation.as_str());
                debug!(
                    todo_id = %stored.todo_id,
                    operation = %stored.operation,
                    event_id = ?stored.id,
                    "Recorded change event"
                );
                Ok(())
            }
            Err(e) => {
                metrics::increment_capture_failures(e.category());
                error!(
                    lifecycle = event.kind(),
                    error = %e,
                    "Change event was not recorded, audit trail has a gap"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OperationType;
    use crate::todo::Todo;
    use bson::oid::ObjectId;
    use bson::Document;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    /// Event store that fails the first `failures` inserts.
    struct FlakyStore {
        failures: AtomicU32,
        error: fn() -> StoreError,
        events: Mutex<Vec<ChangeEvent>>,
    }

    impl FlakyStore {
        fn new(failures: u32, error: fn() -> StoreError) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                error,
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChangeEventStore for FlakyStore {
        async fn insert(&self, event: ChangeEvent) -> Result<ChangeEvent, StoreError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err((self.error)());
            }
            let event = event.with_id(ObjectId::new());
            self.events.lock().await.push(event.clone());
            Ok(event)
        }

        async fn find_all(&self) -> Result<Vec<ChangeEvent>, StoreError> {
            Ok(self.events.lock().await.clone())
        }

        async fn find_by_id(&self, id: &ObjectId) -> Result<Option<ChangeEvent>, StoreError> {
            Ok(self
                .events
                .lock()
                .await
                .iter()
                .find(|e| e.id == Some(*id))
                .cloned())
        }

        async fn find_by_todo_id(&self, todo_id: &str) -> Result<Vec<ChangeEvent>, StoreError> {
            let events = self.events.lock().await;
            Ok(events.iter().filter(|e| e.todo_id == todo_id).cloned().collect())
        }

        async fn find_by_uid(&self, uid: &str) -> Result<Vec<ChangeEvent>, StoreError> {
            let events = self.events.lock().await;
            Ok(events.iter().filter(|e| e.uid == uid).cloned().collect())
        }

        async fn delete_all(&self) -> Result<u64, StoreError> {
            let mut events = self.events.lock().await;
            let count = events.len() as u64;
            events.clear();
            Ok(count)
        }
    }

    fn fast_config(max_retries: u32) -> CaptureConfig {
        CaptureConfig::builder()
            .max_retries(max_retries)
            .retry_delay(Duration::from_millis(1))
            .max_retry_delay(Duration::from_millis(4))
            .build()
            .unwrap()
    }

    fn connection_error() -> StoreError {
        StoreError::Connection("connection reset".into())
    }

    fn duplicate_error() -> StoreError {
        StoreError::DuplicateKey("_id".into())
    }

    fn pristine_todo() -> Todo {
        let now = audit_timestamp();
        Todo::new(ObjectId::new(), "u1", "Title", "Body", false, now, now)
    }

    #[tokio::test]
    async fn test_saved_pristine_todo_records_create() {
        let store = Arc::new(FlakyStore::new(0, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(0));
        let todo = pristine_todo();

        capture
            .on_event(&LifecycleEvent::Saved(todo.clone()))
            .await
            .unwrap();

        let events = store.find_all().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, OperationType::Create);
        assert_eq!(events[0].todo_id, todo.id_hex());
        assert!(events[0].id.is_some());
    }

    #[tokio::test]
    async fn test_saved_modified_todo_records_update() {
        let store = Arc::new(FlakyStore::new(0, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(0));
        let mut todo = pristine_todo();
        todo.updated_at = todo.created_at + ChronoDuration::milliseconds(5);

        capture.on_event(&LifecycleEvent::Saved(todo)).await.unwrap();

        let events = store.find_all().await.unwrap();
        assert_eq!(events[0].operation, OperationType::Update);
    }

    #[tokio::test]
    async fn test_malformed_delete_is_not_recorded() {
        let store = Arc::new(FlakyStore::new(0, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(3));
        let mut raw = pristine_todo().to_document();
        raw.remove("uid");

        let err = capture
            .on_event(&LifecycleEvent::Deleted(raw))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Decode(ref e) if e.field == "uid"));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_delete_document_is_rejected() {
        let store = Arc::new(FlakyStore::new(0, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(0));

        let err = capture
            .on_event(&LifecycleEvent::Deleted(Document::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(3));

        capture
            .on_event(&LifecycleEvent::Saved(pristine_todo()))
            .await
            .unwrap();

        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_persist_failure() {
        let store = Arc::new(FlakyStore::new(10, connection_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(2));
        let todo = pristine_todo();

        let err = capture
            .on_event(&LifecycleEvent::Saved(todo.clone()))
            .await
            .unwrap_err();

        match err {
            CaptureError::Persist {
                todo_id, attempts, ..
            } => {
                assert_eq!(todo_id, todo.id_hex());
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_retryable_failure_is_not_retried() {
        let store = Arc::new(FlakyStore::new(1, duplicate_error));
        let capture = ChangeCapture::new(store.clone(), fast_config(5));

        let err = capture
            .on_event(&LifecycleEvent::Saved(pristine_todo()))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Persist { attempts: 1, .. }));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_retry_and_failure_share_error_labels() {
        for source in [
            StoreError::Connection("down".into()),
            StoreError::Serialization("bad".into()),
            StoreError::DuplicateKey("uid".into()),
            StoreError::Other("boom".into()),
        ] {
            let retried = source.category();
            let failed = CaptureError::Persist {
                todo_id: "t".into(),
                attempts: 1,
                source,
            }
            .category();
            assert_eq!(retried.as_str(), failed.as_str());
        }
        assert_eq!(
            StoreError::Connection("down".into()).category().as_str(),
            "connection_error"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::builder().build().unwrap();
        assert_eq!(config, CaptureConfig::default());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_config_rejects_inverted_delays() {
        let result = CaptureConfig::builder()
            .retry_delay(Duration::from_secs(5))
            .max_retry_delay(Duration::from_secs(1))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_event_stamps_recording_time() {
        let before = Utc::now() - ChronoDuration::seconds(1);
        let event = ChangeCapture::build_event(&LifecycleEvent::Saved(pristine_todo())).unwrap();
        assert!(event.created_at >= before);
    }
}
