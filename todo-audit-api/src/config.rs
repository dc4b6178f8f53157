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

//! Service configuration loaded from environment variables.
//!
//! | Variable                  | Default                     |
//! |---------------------------|-----------------------------|
//! | `HOST`                    | `0.0.0.0`                   |
//! | `PORT`                    | `8080`                      |
//! | `STORAGE_BACKEND`         | `mongodb` (or `memory`)     |
//! | `MONGODB_URI`             | `mongodb://localhost:27017` |
//! | `MONGODB_DATABASE`        | `todo`                      |
//! | `MONGODB_MAX_POOL_SIZE`   | `100`                       |
//! | `MONGODB_MIN_POOL_SIZE`   | `10`                        |
//! | `CAPTURE_MAX_RETRIES`     | `3`                         |
//! | `CAPTURE_FAILURE_POLICY`  | `log` (or `propagate`)      |
//! | `METRICS_ENABLED`         | `true`                      |
//! | `LOG_FORMAT`              | `text` (or `json`)          |

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;
use todo_audit_core::capture::CaptureConfig;
use todo_audit_core::repository::CaptureFailurePolicy;
use todo_audit_core::store::StoreError;
use todo_audit_stores::mongodb::MongoConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The `MongoDB` settings are inconsistent
    #[error("invalid MongoDB configuration: {0}")]
    Mongo(#[from] StoreError),

    /// The capture retry settings are inconsistent
    #[error("invalid capture configuration: {0}")]
    Capture(String),
}

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// `MongoDB` collections
    #[default]
    MongoDb,
    /// Process-local memory
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `mongodb` or `memory`, got `{other}`")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MongoDb => f.write_str("mongodb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Store implementation
    pub storage_backend: StorageBackend,
    /// `MongoDB` settings, used when the backend is `MongoDb`
    pub mongo: MongoConfig,
    /// Change event insert retries
    pub capture: CaptureConfig,
    /// What a failed capture does to the HTTP response
    pub failure_policy: CaptureFailurePolicy,
    /// Serve `/metrics`
    pub metrics_enabled: bool,
    /// Log output format
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparsable or inconsistent values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparsable or inconsistent values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: String = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;
        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "HOST",
                value: host.clone(),
                reason: e.to_string(),
            })?;

        let mut mongo = MongoConfig::builder()
            .max_pool_size(parse_or(&lookup, "MONGODB_MAX_POOL_SIZE", 100)?)
            .min_pool_size(parse_or(&lookup, "MONGODB_MIN_POOL_SIZE", 10)?);
        if let Some(uri) = lookup("MONGODB_URI") {
            mongo = mongo.uri(uri);
        }
        if let Some(database) = lookup("MONGODB_DATABASE") {
            mongo = mongo.database(database);
        }

        let capture = CaptureConfig::builder()
            .max_retries(parse_or(&lookup, "CAPTURE_MAX_RETRIES", 3)?)
            .build()
            .map_err(ConfigError::Capture)?;

        Ok(Self {
            listen_addr,
            storage_backend: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::default())?,
            mongo: mongo.build()?,
            capture,
            failure_policy: parse_or(
                &lookup,
                "CAPTURE_FAILURE_POLICY",
                CaptureFailurePolicy::default(),
            )?,
            metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", true)?,
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::default())?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
