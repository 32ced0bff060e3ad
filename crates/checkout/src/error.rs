//! Mapping of storage failures into the commerce error taxonomy.

use domain::CommerceError;
use persistence::PersistenceError;

/// Attaches the name of the failed operation to a persistence error.
pub trait ResultExt<T> {
    fn context(self, operation: &'static str) -> Result<T, CommerceError>;
}

impl<T> ResultExt<T> for Result<T, PersistenceError> {
    fn context(self, operation: &'static str) -> Result<T, CommerceError> {
        self.map_err(|err| match err {
            PersistenceError::ActiveCartExists(buyer) => {
                CommerceError::conflict(format!("buyer {buyer} already has an active cart"))
            }
            PersistenceError::CartNotActive(cart_id) => {
                CommerceError::conflict(format!("cart {cart_id} is no longer active"))
            }
            other => CommerceError::dependency(operation, other),
        })
    }
}
