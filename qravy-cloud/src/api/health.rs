//! Health check endpoint
//!
//! Public. Answers 200 with `degraded` when the store does not respond.

use std::time::Instant;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: StoreCheck,
}

#[derive(Debug, Serialize)]
pub struct StoreCheck {
    backend: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.catalog.store();
    let started = Instant::now();
    let check = match store.ping().await {
        Ok(()) => StoreCheck {
            backend: store.backend(),
            status: "ok",
            latency_ms: Some(started.elapsed().as_millis() as u64),
            message: None,
        },
        Err(e) => {
            tracing::warn!(backend = store.backend(), error = %e, "Store health check failed");
            StoreCheck {
                backend: store.backend(),
                status: "error",
                latency_ms: None,
                message: Some(e.to_string()),
            }
        }
    };

    Json(HealthResponse {
        status: if check.status == "ok" { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store: check,
    })
}
