//! Read shapes exposed by the store, product and promo collaborators.

use serde::{Deserialize, Serialize};

use crate::{Money, ProductId, StoreId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Buyer,
    Vendor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
}

/// A postal address. Also used as the cart's shipping snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    /// Two-letter state or region code; drives vendor visibility.
    pub state: String,
    pub postal_code: String,
}

/// A buyer or vendor store as seen by the checkout core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreProfile {
    pub id: StoreId,
    pub name: String,
    pub store_type: StoreType,
    pub kyc_status: KycStatus,
    pub subscription_active: bool,
    pub address: Option<Address>,
}

impl StoreProfile {
    /// Returns the store's state code, if the address resolves to one.
    pub fn state(&self) -> Option<&str> {
        self.address
            .as_ref()
            .map(|a| a.state.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn is_kyc_verified(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }

    /// Checks whether this store can sell to a buyer located in `buyer_state`.
    ///
    /// Returns the reason the vendor is unusable, or `None` if it is valid.
    pub fn vendor_rejection(&self, buyer_state: &str) -> Option<String> {
        if self.store_type != StoreType::Vendor {
            return Some("store is not a vendor".to_string());
        }
        if !self.is_kyc_verified() {
            return Some("vendor is not KYC verified".to_string());
        }
        if !self.subscription_active {
            return Some("vendor subscription is inactive".to_string());
        }
        match self.state() {
            Some(state) if state.eq_ignore_ascii_case(buyer_state) => None,
            Some(state) => Some(format!(
                "vendor in {state} cannot sell to buyers in {buyer_state}"
            )),
            None => Some("vendor has no resolvable state".to_string()),
        }
    }
}

/// A volume-discount rule: buying at least `min_qty` units prices each unit at `unit_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min_qty: u32,
    pub unit_price: Money,
}

/// Product detail with inventory snapshot and volume tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: ProductId,
    /// The store that owns (sells) this product.
    pub vendor_id: StoreId,
    pub name: String,
    pub base_price: Money,
    pub moq: u32,
    pub max_qty: Option<u32>,
    pub is_active: bool,
    pub available_qty: u32,
    pub volume_tiers: Vec<VolumeTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub id: StoreId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoKind {
    /// Percentage off the vendor subtotal, in basis points (1500 = 15%).
    PercentOff { basis_points: u32 },
    /// Fixed amount off the vendor subtotal.
    AmountOff { amount: Money },
}

/// A vendor-scoped promo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPromo {
    pub code: String,
    pub vendor_id: StoreId,
    pub kind: PromoKind,
    pub min_subtotal: Money,
}
