//! Checkout output: a checkout group split into one order per vendor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CartId, CartItemId, CheckoutGroupId, Money, OrderLineItemId, PaymentIntentId, ProductId,
    StoreId, VendorOrderId,
};

/// Line status, derived strictly from the reservation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    Pending,
    Rejected,
}

impl LineItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemStatus::Pending => "pending",
            LineItemStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LineItemStatus::Pending),
            "rejected" => Some(LineItemStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPayment,
}

impl PaymentIntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::RequiresPayment => "requires_payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requires_payment" => Some(PaymentIntentStatus::RequiresPayment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: OrderLineItemId,
    pub vendor_order_id: VendorOrderId,
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub status: LineItemStatus,
    pub rejection_reason: Option<String>,
}

impl OrderLineItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// The payment record created alongside each vendor order. Capture happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub vendor_order_id: VendorOrderId,
    pub amount: Money,
    pub currency: String,
    pub payment_method: String,
    pub status: PaymentIntentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOrder {
    pub id: VendorOrderId,
    pub checkout_group_id: CheckoutGroupId,
    pub vendor_id: StoreId,
    /// Sum of the pending (reserved) lines.
    pub subtotal: Money,
    pub note: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub payment_intent: PaymentIntent,
    pub created_at: DateTime<Utc>,
}

impl VendorOrder {
    pub fn pending_items(&self) -> impl Iterator<Item = &OrderLineItem> {
        self.line_items
            .iter()
            .filter(|item| item.status == LineItemStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutGroup {
    pub id: CheckoutGroupId,
    pub buyer_store_id: StoreId,
    pub cart_id: CartId,
    pub currency: String,
    pub vendor_orders: Vec<VendorOrder>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutGroup {
    pub fn vendor_order_ids(&self) -> Vec<VendorOrderId> {
        self.vendor_orders.iter().map(|order| order.id).collect()
    }

    pub fn line_items(&self) -> impl Iterator<Item = &OrderLineItem> {
        self.vendor_orders
            .iter()
            .flat_map(|order| order.line_items.iter())
    }
}

/// Caller-supplied checkout options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub payment_method: String,
    #[serde(default)]
    pub note: Option<String>,
    /// Abort the whole checkout with a conflict if any line cannot be reserved.
    #[serde(default)]
    pub fail_on_shortfall: bool,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            payment_method: "invoice".to_string(),
            note: None,
            fail_on_shortfall: false,
        }
    }
}

impl CheckoutOptions {
    /// Turns on `fail_on_shortfall`.
    pub fn strict(mut self) -> Self {
        self.fail_on_shortfall = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_keeps_other_options() {
        let options = CheckoutOptions {
            note: Some("dock 4".to_string()),
            ..CheckoutOptions::default()
        }
        .strict();

        assert!(options.fail_on_shortfall);
        assert_eq!(options.payment_method, "invoice");
        assert_eq!(options.note.as_deref(), Some("dock 4"));
    }
}
