//! Error taxonomy shared by the quote, cart and checkout services.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CartItemId, ProductId};

/// A single structured violation reported with a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub cart_item_id: Option<CartItemId>,
    pub product_id: ProductId,
    /// Machine-readable reason, e.g. `insufficient_inventory`.
    pub code: String,
    pub message: String,
}

/// Errors returned by marketplace operations.
///
/// None of these are retried inside the core; callers decide on retry policy.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// The request is malformed or violates a business rule. No writes occurred.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller is not allowed to perform the operation (role, KYC, ownership).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation conflicts with current state.
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        violations: Vec<Violation>,
    },

    /// An underlying store or collaborator failed.
    #[error("Dependency failure during {operation}: {source}")]
    Dependency {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CommerceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a conflict without a violation list.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Wraps an underlying failure with the operation that was being performed.
    pub fn dependency<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Dependency {
            operation,
            source: Box::new(source),
        }
    }
}

/// Convenience type alias for marketplace results.
pub type Result<T> = std::result::Result<T, CommerceError>;
