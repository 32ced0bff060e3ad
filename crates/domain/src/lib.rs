//! Domain layer for the marketplace checkout core.
//!
//! This crate provides:
//! - Cart, checkout and inventory entities
//! - Collaborator lookups (stores, products, promos) with in-memory adapters
//! - Pure pricing rules used by the quote pipeline
//! - The `CommerceError` taxonomy shared by every service

pub mod cart;
pub mod error;
pub mod events;
pub mod inventory;
pub mod lookup;
pub mod order;
pub mod outbox;
pub mod pricing;
pub mod store;

pub use cart::{
    AppliedDiscount, Cart, CartItem, CartItemStatus, CartStatus, CartVendorGroup, CartWarning,
    QuoteItemRequest, QuoteRequest, VendorGroupStatus,
};
pub use common::{
    CartId, CartItemId, CheckoutGroupId, EventId, Money, OrderLineItemId, PaymentIntentId,
    ProductId, StoreId, VendorOrderId,
};
pub use error::{CommerceError, Result, Violation};
pub use events::{DomainEvent, OrderCreated};
pub use inventory::{
    INSUFFICIENT_INVENTORY, INVALID_ITEM, InventoryItem, ReservationRequest, ReservationResult,
};
pub use lookup::{InMemoryCatalog, ProductLookup, PromoLookup, StoreLookup};
pub use order::{
    CheckoutGroup, CheckoutOptions, LineItemStatus, OrderLineItem, PaymentIntent,
    PaymentIntentStatus, VendorOrder,
};
pub use outbox::OutboxEvent;
pub use store::{
    Address, KycStatus, ProductDetail, PromoKind, StoreProfile, StoreType, VendorPromo,
    VendorSummary, VolumeTier,
};
