//! Liveness and storage readiness check.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use persistence::{Transaction, TransactionRunner};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: &'static str,
}

/// GET /health: opens and rolls back a transaction to confirm the store answers.
pub async fn check<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let storage_ok = match state.db.begin().await {
        Ok(tx) => tx.rollback().await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            false
        }
    };

    if storage_ok {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                storage: "ok",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                storage: "unavailable",
            }),
        )
    }
}
