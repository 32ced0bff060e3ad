//! Read-only outbox inspection for operators.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::OutboxEvent;
use persistence::TransactionRunner;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// GET /outbox?limit=N: the newest outbox rows, oldest first.
#[tracing::instrument(skip(state, query))]
pub async fn recent<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<OutboxEvent>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Ok(Json(checkout::recent_events(&state.db, limit).await?))
}

/// GET /outbox/:aggregate_id: every outbox row for one aggregate.
#[tracing::instrument(skip(state))]
pub async fn for_aggregate<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(aggregate_id): Path<String>,
) -> Result<Json<Vec<OutboxEvent>>, ApiError> {
    let aggregate_id = uuid::Uuid::parse_str(&aggregate_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid aggregate id: {e}")))?;
    Ok(Json(
        checkout::events_for_aggregate(&state.db, aggregate_id).await?,
    ))
}
