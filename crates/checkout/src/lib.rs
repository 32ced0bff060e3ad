//! Marketplace checkout services.
//!
//! - [`CartService`] turns quote requests into the buyer's active cart.
//! - [`CheckoutExecutor`] converts an active cart into per-vendor orders.
//! - [`reserve_inventory`] and [`OutboxWriter`] run inside the executor's
//!   transaction, so a failed checkout leaves no reservations or events behind.

pub mod config;
pub mod error;
pub mod executor;
pub mod outbox;
pub mod quote;
pub mod reservation;

pub use config::CartConfig;
pub use error::ResultExt;
pub use executor::CheckoutExecutor;
pub use outbox::{OutboxWriter, TransactionalOutbox, events_for_aggregate, recent_events};
pub use quote::CartService;
pub use reservation::reserve_inventory;
