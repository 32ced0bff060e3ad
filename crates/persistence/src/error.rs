use domain::{CartId, StoreId};
use thiserror::Error;

/// Errors that can occur when interacting with the marketplace store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A second active cart was written for the same buyer.
    #[error("Buyer {0} already has an active cart")]
    ActiveCartExists(StoreId),

    /// An update targeted a cart that does not exist.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// A write targeted a cart that is no longer active.
    #[error("Cart {0} is no longer active")]
    CartNotActive(CartId),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },

    /// The store refused the operation (used by the in-memory store's fail points).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
