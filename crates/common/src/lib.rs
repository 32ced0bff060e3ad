//! Shared identifier and money types for the marketplace workspace.

mod money;
mod types;

pub use money::Money;
pub use types::{
    CartId, CartItemId, CheckoutGroupId, EventId, OrderLineItemId, PaymentIntentId, ProductId,
    StoreId, VendorOrderId,
};
