//! Cart aggregate: the buyer's single active quote snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, CartId, CartItemId, Money, ProductId, StoreId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    Converted,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Converted => "converted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CartStatus::Active),
            "converted" => Some(CartStatus::Converted),
            _ => None,
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single cart line. Priority: `Invalid` > `NotAvailable` > `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartItemStatus {
    Ok,
    NotAvailable,
    Invalid,
}

impl CartItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartItemStatus::Ok => "ok",
            CartItemStatus::NotAvailable => "not_available",
            CartItemStatus::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(CartItemStatus::Ok),
            "not_available" => Some(CartItemStatus::NotAvailable),
            "invalid" => Some(CartItemStatus::Invalid),
            _ => None,
        }
    }

    /// Returns the more severe of the two statuses.
    pub fn escalate(self, other: CartItemStatus) -> CartItemStatus {
        self.max(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorGroupStatus {
    Ok,
    Invalid,
}

impl VendorGroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorGroupStatus::Ok => "ok",
            VendorGroupStatus::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(VendorGroupStatus::Ok),
            "invalid" => Some(VendorGroupStatus::Invalid),
            _ => None,
        }
    }
}

/// A warning attached to a cart item or vendor group.
///
/// Serialized with a snake_case `code` tag, e.g. `{"code":"vendor_mismatch",...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CartWarning {
    VendorMismatch {
        requested_vendor: StoreId,
        owning_vendor: StoreId,
    },
    VendorInvalid {
        reason: String,
    },
    ProductNotFound,
    ProductInactive,
    InsufficientInventory {
        available: u32,
        requested: u32,
    },
    ClampedToMoq {
        requested: u32,
        moq: u32,
    },
    ClampedToMax {
        requested: u32,
        max_qty: u32,
    },
    PriceChanged {
        previous: Money,
        current: Money,
    },
    PromoNotApplied {
        promo_code: String,
        reason: String,
    },
}

impl CartWarning {
    /// Returns the machine-readable warning code.
    pub fn code(&self) -> &'static str {
        match self {
            CartWarning::VendorMismatch { .. } => "vendor_mismatch",
            CartWarning::VendorInvalid { .. } => "vendor_invalid",
            CartWarning::ProductNotFound => "product_not_found",
            CartWarning::ProductInactive => "product_inactive",
            CartWarning::InsufficientInventory { .. } => "insufficient_inventory",
            CartWarning::ClampedToMoq { .. } => "clamped_to_moq",
            CartWarning::ClampedToMax { .. } => "clamped_to_max",
            CartWarning::PriceChanged { .. } => "price_changed",
            CartWarning::PromoNotApplied { .. } => "promo_not_applied",
        }
    }
}

/// A volume discount that was applied to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub label: String,
    /// Total saved on the line versus the base price.
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub vendor_id: StoreId,
    pub product_name: String,
    pub requested_qty: u32,
    /// Quantity after MOQ / max-qty normalization.
    pub quantity: u32,
    pub moq: u32,
    pub max_qty: Option<u32>,
    pub base_price: Money,
    pub unit_price: Money,
    pub discount: Option<AppliedDiscount>,
    pub subtotal: Money,
    pub status: CartItemStatus,
    pub warnings: Vec<CartWarning>,
}

impl CartItem {
    pub fn is_ok(&self) -> bool {
        self.status == CartItemStatus::Ok
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartVendorGroup {
    pub vendor_id: StoreId,
    pub promo_code: Option<String>,
    pub status: VendorGroupStatus,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub warnings: Vec<CartWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub buyer_store_id: StoreId,
    pub status: CartStatus,
    pub currency: String,
    pub shipping_address: Option<Address>,
    pub ad_tokens: Vec<String>,
    pub valid_until: DateTime<Utc>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub items: Vec<CartItem>,
    pub vendor_groups: Vec<CartVendorGroup>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }

    /// Indexes stored unit prices by `(product, vendor)`.
    pub fn price_index(&self) -> HashMap<(ProductId, StoreId), Money> {
        self.items
            .iter()
            .map(|item| ((item.product_id, item.vendor_id), item.unit_price))
            .collect()
    }

    /// Returns the items grouped by vendor, in first-appearance order.
    pub fn items_by_vendor(&self) -> Vec<(StoreId, Vec<&CartItem>)> {
        let mut groups: Vec<(StoreId, Vec<&CartItem>)> = Vec::new();
        for item in &self.items {
            match groups.iter_mut().find(|(vendor, _)| *vendor == item.vendor_id) {
                Some((_, items)) => items.push(item),
                None => groups.push((item.vendor_id, vec![item])),
            }
        }
        groups
    }
}

/// One requested line in a quote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItemRequest {
    pub product_id: ProductId,
    pub vendor_store_id: StoreId,
    pub quantity: u32,
}

/// Input of the quote pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<QuoteItemRequest>,
    #[serde(default)]
    pub ad_tokens: Vec<String>,
    /// Promo code per vendor.
    #[serde(default)]
    pub promo_codes: HashMap<StoreId, String>,
}

impl QuoteRequest {
    pub fn new(items: Vec<QuoteItemRequest>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_promo(mut self, vendor_id: StoreId, code: impl Into<String>) -> Self {
        self.promo_codes.insert(vendor_id, code.into());
        self
    }

    pub fn with_ad_token(mut self, token: impl Into<String>) -> Self {
        self.ad_tokens.push(token.into());
        self
    }
}
