//! Quote and active-cart endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{Cart, QuoteItemRequest, QuoteRequest, StoreId};
use persistence::TransactionRunner;
use serde::Deserialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct QuoteCartRequest {
    pub buyer_store_id: StoreId,
    pub items: Vec<QuoteItemRequest>,
    #[serde(default)]
    pub ad_tokens: Vec<String>,
    /// Promo code keyed by vendor store id.
    #[serde(default)]
    pub promo_codes: HashMap<StoreId, String>,
}

/// POST /carts/quote: price items and store them as the buyer's active cart.
#[tracing::instrument(skip(state, req), fields(buyer_store_id = %req.buyer_store_id))]
pub async fn quote<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<QuoteCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let request = QuoteRequest {
        items: req.items,
        ad_tokens: req.ad_tokens,
        promo_codes: req.promo_codes,
    };
    let cart = state.carts.quote_cart(req.buyer_store_id, request).await?;
    Ok(Json(cart))
}

/// GET /carts/active/:buyer_id: the buyer's active cart.
#[tracing::instrument(skip(state))]
pub async fn active<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Path(buyer_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let buyer_store_id: StoreId = parse_id("store", &buyer_id)?;
    let cart = state.carts.get_active_cart(buyer_store_id).await?;
    Ok(Json(cart))
}
