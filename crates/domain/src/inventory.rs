//! Inventory rows and reservation request/result shapes.

use serde::{Deserialize, Serialize};

use crate::{CartItemId, ProductId};

/// Reason recorded when a reservation cannot be satisfied.
pub const INSUFFICIENT_INVENTORY: &str = "insufficient_inventory";

/// Reason recorded for a line the quote marked invalid; it is never reserved.
pub const INVALID_ITEM: &str = "invalid_item";

/// Stock for one product. Only the reservation engine mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_id: ProductId,
    pub available_qty: u32,
    pub reserved_qty: u32,
}

impl InventoryItem {
    pub fn new(product_id: ProductId, available_qty: u32) -> Self {
        Self {
            product_id,
            available_qty,
            reserved_qty: 0,
        }
    }

    /// Moves `qty` units from available to reserved if enough are available.
    ///
    /// Returns false and leaves the item untouched otherwise.
    pub fn try_reserve(&mut self, qty: u32) -> bool {
        if self.available_qty < qty {
            return false;
        }
        self.available_qty -= qty;
        self.reserved_qty += qty;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    /// Signed so that non-positive quantities can be rejected explicitly.
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationResult {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub reserved: bool,
    pub reason: Option<String>,
}

impl ReservationResult {
    pub fn reserved(request: &ReservationRequest) -> Self {
        Self {
            cart_item_id: request.cart_item_id,
            product_id: request.product_id,
            quantity: request.quantity,
            reserved: true,
            reason: None,
        }
    }

    pub fn insufficient(request: &ReservationRequest) -> Self {
        Self {
            cart_item_id: request.cart_item_id,
            product_id: request.product_id,
            quantity: request.quantity,
            reserved: false,
            reason: Some(INSUFFICIENT_INVENTORY.to_string()),
        }
    }

    /// Outcome for a line that was kept out of the reservation batch.
    pub fn invalid(request: &ReservationRequest) -> Self {
        Self {
            reason: Some(INVALID_ITEM.to_string()),
            ..Self::insufficient(request)
        }
    }
}
