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

//! Metrics instrumentation for change capture observability.
//!
//! Uses the `metrics` crate facade, so any exporter (Prometheus, StatsD, ...)
//! installed by the binary receives these values. Without an installed
//! recorder every call is a no-op.
//!
//! # Naming Conventions
//!
//! - Prefix with `todo_audit_`
//! - Counters end with `_total`
//! - Include the unit suffix (`_seconds`)
//!
//! # Labels
//!
//! - **operation**: `CREATE`, `UPDATE`, `DELETE` (very low cardinality)
//! - **lifecycle**: `saved`, `deleted`
//! - **error_type**: [`ErrorCategory`] label
//!
//! Never label with todo ids or user ids.
//!
//! # Examples
//!
//! ```rust
//! use todo_audit_core::metrics::{self, ErrorCategory};
//!
//! metrics::increment_events_recorded("CREATE");
//! metrics::increment_capture_failures(ErrorCategory::Connection);
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric name prefix for all metrics of this crate.
#[doc(hidden)]
pub const METRIC_PREFIX: &str = "todo_audit";

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Total number of change events successfully recorded.
///
/// Type: Counter
/// Labels: operation
#[doc(hidden)]
pub const EVENTS_RECORDED_TOTAL: &str = "todo_audit_change_events_recorded_total";

/// Total number of Todo mutations whose change event was not recorded.
///
/// Type: Counter
/// Labels: error_type
#[doc(hidden)]
pub const CAPTURE_FAILURES_TOTAL: &str = "todo_audit_capture_failures_total";

/// Total number of change event insert retries.
///
/// Type: Counter
/// Labels: error_type
const CAPTURE_RETRIES_TOTAL: &str = "todo_audit_capture_retries_total";

/// Time from lifecycle notification to a recorded (or failed) event.
///
/// Type: Histogram
/// Labels: lifecycle
/// Unit: seconds
#[doc(hidden)]
pub const CAPTURE_DURATION_SECONDS: &str = "todo_audit_capture_duration_seconds";

/// Total number of committed Todo mutations.
///
/// Type: Counter
/// Labels: lifecycle
const TODO_MUTATIONS_TOTAL: &str = "todo_audit_todo_mutations_total";

/// Registers metric descriptions with the installed recorder.
///
/// Call once at startup, after installing an exporter.
pub fn init_metrics() {
    describe_counter!(
        EVENTS_RECORDED_TOTAL,
        "Total number of change events successfully recorded"
    );

    describe_counter!(
        CAPTURE_FAILURES_TOTAL,
        "Total number of Todo mutations whose change event could not be recorded"
    );

    describe_counter!(
        CAPTURE_RETRIES_TOTAL,
        "Total number of retried change event inserts"
    );

    describe_counter!(
        TODO_MUTATIONS_TOTAL,
        "Total number of committed Todo writes and deletes"
    );

    describe_histogram!(
        CAPTURE_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time taken to build and persist a change event, including retries"
    );
}

/// Increments the count of recorded change events.
pub fn increment_events_recorded(operation: &str) {
    counter!(EVENTS_RECORDED_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Increments the count of audit gaps.
pub fn increment_capture_failures(error_category: ErrorCategory) {
    counter!(CAPTURE_FAILURES_TOTAL, "error_type" => error_category.as_str()).increment(1);
}

/// Increments the count of retried change event inserts.
pub fn increment_capture_retries(error_category: ErrorCategory) {
    counter!(CAPTURE_RETRIES_TOTAL, "error_type" => error_category.as_str()).increment(1);
}

/// Increments the count of committed Todo mutations.
pub fn increment_todo_mutations(lifecycle: &'static str) {
    counter!(TODO_MUTATIONS_TOTAL, "lifecycle" => lifecycle).increment(1);
}

/// Records how long a capture took.
pub fn record_capture_duration(duration: Duration, lifecycle: &str) {
    histogram!(CAPTURE_DURATION_SECONDS, "lifecycle" => lifecycle.to_string())
        .record(duration.as_secs_f64());
}

/// Error categories for consistent metric labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection error (network, pool, server selection)
    Connection,
    /// Serialization error (malformed BSON document)
    Serialization,
    /// Validation error (constraint violations)
    Validation,
    /// Not found error
    NotFound,
    /// Unknown error (unclassified)
    Unknown,
}

impl ErrorCategory {
    /// Returns the error category as a static string for metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection_error",
            Self::Serialization => "serialization_error",
            Self::Validation => "validation_error",
            Self::NotFound => "not_found_error",
            Self::Unknown => "unknown_error",
        }
    }
}

/// Records the elapsed time through a callback when dropped.
///
/// ```rust
/// use todo_audit_core::metrics::{self, Timer};
///
/// {
///     let _timer = Timer::new("saved", |duration, lifecycle| {
///         metrics::record_capture_duration(duration, lifecycle);
///     });
///     // ... work to time ...
/// }
/// ```
pub struct Timer<F>
where
    F: FnOnce(Duration, &str),
{
    start: std::time::Instant,
    label: String,
    record_fn: Option<F>,
}

impl<F> Timer<F>
where
    F: FnOnce(Duration, &str),
{
    /// Creates a new timer that will record the duration when dropped.
    pub fn new(label: impl Into<String>, record_fn: F) -> Self {
        Self {
            start: std::time::Instant::now(),
            label: label.into(),
            record_fn: Some(record_fn),
        }
    }
}

impl<F> Drop for Timer<F>
where
    F: FnOnce(Duration, &str),
{
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        if let Some(record_fn) = self.record_fn.take() {
            record_fn(duration, &self.label);
        }
    }
}
