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

//! Error types for HTTP handlers.
//!
//! [`ApiError`] bridges domain errors and HTTP responses. Every error is
//! rendered with the same JSON body:
//!
//! ```json
//! {
//!   "timestamp": "2025-01-01T12:00:00Z",
//!   "status": 400,
//!   "error": "Bad Request",
//!   "message": "Validation failed",
//!   "errors": { "title": "Title is required" }
//! }
//! ```

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use todo_audit_core::service::ServiceError;
use todo_audit_core::store::StoreError;

const GENERIC_MESSAGE: &str = "An unexpected error occurred";

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// User-facing message
    message: String,
    /// Per-field validation messages
    errors: BTreeMap<String, String>,
    /// Internal error, logged but never exposed
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Creates a new error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: BTreeMap::new(),
            source: None,
        }
    }

    /// Attaches an internal source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates a 400 error carrying per-field messages.
    #[must_use]
    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self {
            errors,
            ..Self::new(StatusCode::BAD_REQUEST, "Validation failed")
        }
    }

    /// Creates a 400 error for a single field.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(BTreeMap::from([(field.into(), message.into())]))
    }

    /// Creates a 404 error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 500 error with a generic message.
    #[must_use]
    pub fn internal(source: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE).with_source(source)
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    timestamp: DateTime<Utc>,
    status: u16,
    error: &'static str,
    message: String,
    errors: BTreeMap<String, String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            timestamp: Utc::now(),
            status: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Unknown"),
            message: self.message,
            errors: self.errors,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => Self::not_found(err.to_string()),
            ServiceError::Validation(errors) => Self::validation(errors),
            ServiceError::Repository(source) => Self::internal(source.into()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                Self::invalid_field("body", rejection.body_text())
            }
            other => Self::new(other.status(), other.body_text()),
        }
    }
}
