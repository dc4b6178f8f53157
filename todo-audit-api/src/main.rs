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

//! Todo audit HTTP service.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use todo_audit_api::config::{AppConfig, LogFormat, StorageBackend};
use todo_audit_api::state::AppState;
use todo_audit_stores::memory::{MemoryChangeEventStore, MemoryTodoStore};
use todo_audit_stores::mongodb::MongoStore;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "todo_audit_api=info,todo_audit_core=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage_backend,
        failure_policy = %config.failure_policy,
        "Starting todo audit service"
    );

    let (mut state, mongo) = match config.storage_backend {
        StorageBackend::MongoDb => {
            let store = MongoStore::connect(config.mongo.clone())
                .await
                .context("Failed to connect to MongoDB")?;
            store
                .ensure_indexes()
                .await
                .context("Failed to create MongoDB indexes")?;
            let state = AppState::new(
                Arc::new(store.todo_store()),
                Arc::new(store.change_event_store()),
                config.capture.clone(),
                config.failure_policy,
            );
            (state, Some(store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; todos and change events are lost on restart");
            let state = AppState::new(
                Arc::new(MemoryTodoStore::new()),
                Arc::new(MemoryChangeEventStore::new()),
                config.capture.clone(),
                config.failure_policy,
            );
            (state, None)
        }
    };

    if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        todo_audit_core::metrics::init_metrics();
        state = state.with_metrics(handle);
    }

    let app = todo_audit_api::app(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(store) = mongo {
        store.shutdown().await;
    }
    info!("Stopped");
    Ok(())
}
