//! Seeding endpoints for the demo catalog and stock levels.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::ResultExt;
use domain::{InventoryItem, ProductDetail, StoreProfile, VendorPromo};
use persistence::{InventoryRepository, Transaction, TransactionRunner};

use super::AppState;
use crate::error::ApiError;

/// POST /admin/stores
#[tracing::instrument(skip(state, store), fields(store_id = %store.id))]
pub async fn upsert_store<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(store): Json<StoreProfile>,
) -> StatusCode {
    state.catalog.insert_store(store);
    StatusCode::NO_CONTENT
}

/// POST /admin/products
#[tracing::instrument(skip(state, product), fields(product_id = %product.id))]
pub async fn upsert_product<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(product): Json<ProductDetail>,
) -> StatusCode {
    state.catalog.insert_product(product);
    StatusCode::NO_CONTENT
}

/// POST /admin/promos
#[tracing::instrument(skip(state, promo), fields(vendor_id = %promo.vendor_id))]
pub async fn upsert_promo<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(promo): Json<VendorPromo>,
) -> StatusCode {
    state.catalog.insert_promo(promo);
    StatusCode::NO_CONTENT
}

/// PUT /admin/inventory: overwrite stock for one product.
#[tracing::instrument(skip(state, item), fields(product_id = %item.product_id))]
pub async fn set_inventory<D: TransactionRunner + 'static>(
    State(state): State<Arc<AppState<D>>>,
    Json(item): Json<InventoryItem>,
) -> Result<StatusCode, ApiError> {
    let mut tx = state.db.begin().await.context("begin transaction")?;
    tx.upsert_inventory(&item).await.context("upsert inventory")?;
    tx.commit().await.context("commit inventory")?;
    Ok(StatusCode::NO_CONTENT)
}
