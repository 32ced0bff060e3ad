//! HTTP API for the marketplace checkout core.
//!
//! Exposes quoting, checkout and outbox inspection over REST, plus seeding
//! routes for the in-memory catalog. Requests are traced with `tracing` and
//! service counters are scraped from `/metrics`.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{CartConfig, CartService, CheckoutExecutor};
use domain::InMemoryCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use persistence::TransactionRunner;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D: TransactionRunner + 'static>(
    state: Arc<AppState<D>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<D>))
        .route("/carts/quote", post(routes::carts::quote::<D>))
        .route("/carts/active/{buyer_id}", get(routes::carts::active::<D>))
        .route("/checkout", post(routes::checkouts::execute::<D>))
        .route("/checkout/{id}", get(routes::checkouts::get::<D>))
        .route("/outbox", get(routes::outbox::recent::<D>))
        .route(
            "/outbox/{aggregate_id}",
            get(routes::outbox::for_aggregate::<D>),
        )
        .route("/admin/stores", post(routes::admin::upsert_store::<D>))
        .route("/admin/products", post(routes::admin::upsert_product::<D>))
        .route("/admin/promos", post(routes::admin::upsert_promo::<D>))
        .route("/admin/inventory", put(routes::admin::set_inventory::<D>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the quote and checkout services over one store and catalog.
pub fn create_state<D: TransactionRunner + Clone>(
    db: D,
    catalog: InMemoryCatalog,
    config: CartConfig,
) -> Arc<AppState<D>> {
    Arc::new(AppState {
        carts: CartService::new(db.clone(), catalog.clone(), config),
        checkout: CheckoutExecutor::new(db.clone()),
        catalog,
        db,
    })
}

/// Registers help text for the service metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("cart_quotes_total", "Quote requests received");
    metrics::describe_counter!("checkout_executions_total", "Checkout attempts");
    metrics::describe_counter!("checkout_failures_total", "Checkouts rolled back");
    metrics::describe_histogram!(
        "checkout_duration_seconds",
        metrics::Unit::Seconds,
        "Wall time of a checkout transaction"
    );
    metrics::describe_counter!(
        "inventory_reservations_total",
        "Reservation attempts by outcome"
    );
    metrics::describe_counter!(
        "outbox_events_emitted_total",
        "Outbox rows written by event type"
    );
}
