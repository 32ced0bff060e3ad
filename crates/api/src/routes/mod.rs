//! HTTP route handlers.

pub mod admin;
pub mod carts;
pub mod checkouts;
pub mod health;
pub mod metrics;
pub mod outbox;

use std::str::FromStr;

use checkout::{CartService, CheckoutExecutor};
use domain::InMemoryCatalog;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<D> {
    pub carts: CartService<D, InMemoryCatalog>,
    pub checkout: CheckoutExecutor<D>,
    /// Store, product and promo data served to the quote pipeline.
    pub catalog: InMemoryCatalog,
    pub db: D,
}

/// Parses a UUID-backed id from a path segment.
fn parse_id<T>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}
