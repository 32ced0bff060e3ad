//! Checkout execution endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CartId, CheckoutGroup, CheckoutGroupId, CheckoutOptions, StoreId};
use persistence::TransactionRunner;
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub buyer_store_id: StoreId,
    pub cart_id: CartId,
    pub payment_method: Option<String>,
    pub note: Option<String>,
    #[serde(default)]
    pub fail_on_shortfall: bool,
}

impl CheckoutRequest {
    fn options(&self) -> CheckoutOptions {
        let defaults = CheckoutOptions::default();
        CheckoutOptions {
            payment_method: self
                .payment_method
                .clone()
                .unwrap_or(defaults.payment_method),
            note: self.note.clone(),
            fail_on_shortfall: self.fail_on_shortfall,
        }
    }
}

/// POST /checkout: convert the buyer's cart into vendor orders.
#[tracing::instrument(skip(state, req), fields(cart_id = %req.cart_id))]
pub async fn execute<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutGroup>), ApiError> {
    let group = state
        .checkout
        .execute(req.buyer_store_id, req.cart_id, req.options())
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /checkout/:id: a checkout group with its vendor orders.
#[tracing::instrument(skip(state))]
pub async fn get<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(id): Path<String>,
) -> Result<Json<CheckoutGroup>, ApiError> {
    let group_id: CheckoutGroupId = parse_id("checkout group", &id)?;
    Ok(Json(state.checkout.get_checkout_group(group_id).await?))
}
