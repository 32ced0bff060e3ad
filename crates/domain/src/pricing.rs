//! Pure pricing rules used by the quote pipeline.
//!
//! Nothing in here touches storage or collaborators, so every rule can be
//! exercised directly in unit tests and benchmarks.

use crate::{
    AppliedDiscount, CartItem, CartVendorGroup, CartWarning, Money, PromoKind, StoreId,
    VendorGroupStatus, VendorPromo, VolumeTier,
};

/// Applies the MOQ floor and the optional max-qty ceiling to a requested quantity.
///
/// Each clamp that actually changes the value contributes one warning.
pub fn normalize_quantity(
    requested: u32,
    moq: u32,
    max_qty: Option<u32>,
) -> (u32, Vec<CartWarning>) {
    let mut warnings = Vec::new();
    let mut quantity = requested.max(moq);
    if quantity != requested {
        warnings.push(CartWarning::ClampedToMoq { requested, moq });
    }

    if let Some(max_qty) = max_qty
        && quantity > max_qty
    {
        quantity = max_qty;
        warnings.push(CartWarning::ClampedToMax { requested, max_qty });
    }

    (quantity, warnings)
}

/// Picks the qualifying tier with the largest `min_qty`, if any qualifies.
pub fn select_volume_tier(tiers: &[VolumeTier], quantity: u32) -> Option<&VolumeTier> {
    tiers
        .iter()
        .filter(|tier| tier.min_qty <= quantity)
        .max_by_key(|tier| tier.min_qty)
}

/// Resolved price of one cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePrice {
    pub unit_price: Money,
    pub discount: Option<AppliedDiscount>,
    pub subtotal: Money,
}

/// Prices a line at `quantity`, using the best volume tier when one qualifies.
pub fn price_line(base_price: Money, tiers: &[VolumeTier], quantity: u32) -> LinePrice {
    match select_volume_tier(tiers, quantity) {
        Some(tier) => LinePrice {
            unit_price: tier.unit_price,
            discount: Some(AppliedDiscount {
                label: format!("Volume tier {}+", tier.min_qty),
                amount: (base_price - tier.unit_price).multiply(quantity).non_negative(),
            }),
            subtotal: tier.unit_price.multiply(quantity),
        },
        None => LinePrice {
            unit_price: base_price,
            discount: None,
            subtotal: base_price.multiply(quantity),
        },
    }
}

/// Computes the discount a promo grants on `subtotal`, capped at the subtotal.
///
/// Returns the reason the promo does not apply otherwise.
pub fn promo_discount(
    promo: &VendorPromo,
    vendor_id: StoreId,
    subtotal: Money,
) -> Result<Money, String> {
    if promo.vendor_id != vendor_id {
        return Err("promo code belongs to another vendor".to_string());
    }
    if subtotal < promo.min_subtotal {
        return Err(format!("minimum subtotal of {} not met", promo.min_subtotal));
    }
    let discount = match promo.kind {
        PromoKind::PercentOff { basis_points } => subtotal.percentage(basis_points.min(10_000)),
        PromoKind::AmountOff { amount } => amount,
    };
    Ok(discount.non_negative().min(subtotal))
}

/// Returns the distinct vendors referenced by `items`, in first-appearance order.
pub fn vendors_in_order<'a>(vendors: impl IntoIterator<Item = &'a StoreId>) -> Vec<StoreId> {
    let mut ordered: Vec<StoreId> = Vec::new();
    for vendor in vendors {
        if !ordered.contains(vendor) {
            ordered.push(*vendor);
        }
    }
    ordered
}

/// Promo information supplied for one vendor group.
#[derive(Debug, Clone, Copy)]
pub struct GroupPromo<'a> {
    pub code: &'a str,
    /// `None` when the code did not resolve to a promo.
    pub promo: Option<&'a VendorPromo>,
}

/// Derives a vendor group from that vendor's items.
///
/// Only `Ok` items count toward the subtotal; a group with no `Ok` item is `Invalid`.
pub fn summarize_vendor_group(
    vendor_id: StoreId,
    items: &[&CartItem],
    promo: Option<GroupPromo<'_>>,
) -> CartVendorGroup {
    let subtotal: Money = items
        .iter()
        .filter(|item| item.is_ok())
        .map(|item| item.subtotal)
        .sum::<Money>()
        .non_negative();
    let has_ok_item = items.iter().any(|item| item.is_ok());

    let mut warnings = Vec::new();
    let status = if has_ok_item {
        VendorGroupStatus::Ok
    } else {
        warnings.push(CartWarning::VendorInvalid {
            reason: "vendor has no orderable items".to_string(),
        });
        VendorGroupStatus::Invalid
    };

    let mut discount = Money::zero();
    if let Some(GroupPromo { code, promo }) = promo {
        let outcome = match promo {
            None => Err("unknown promo code".to_string()),
            Some(_) if !has_ok_item => Err("vendor has no orderable items".to_string()),
            Some(promo) => promo_discount(promo, vendor_id, subtotal),
        };
        match outcome {
            Ok(amount) => discount = amount,
            Err(reason) => warnings.push(CartWarning::PromoNotApplied {
                promo_code: code.to_string(),
                reason,
            }),
        }
    }

    let discount = discount.non_negative().min(subtotal);
    CartVendorGroup {
        vendor_id,
        promo_code: promo.map(|p| p.code.to_string()),
        status,
        subtotal,
        discount,
        total: (subtotal - discount).non_negative(),
        warnings,
    }
}

/// Cart-level totals derived from the vendor groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// Sums vendor groups into cart totals: all ≥ 0 and discount never above subtotal.
pub fn cart_totals(groups: &[CartVendorGroup]) -> CartTotals {
    let subtotal = groups
        .iter()
        .map(|g| g.subtotal)
        .sum::<Money>()
        .non_negative();
    let discount = groups
        .iter()
        .map(|g| g.discount)
        .sum::<Money>()
        .non_negative()
        .min(subtotal);
    CartTotals {
        subtotal,
        discount,
        total: (subtotal - discount).non_negative(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartItemId, CartItemStatus, ProductId};

    fn tiers() -> Vec<VolumeTier> {
        vec![
            VolumeTier {
                min_qty: 10,
                unit_price: Money::from_cents(900),
            },
            VolumeTier {
                min_qty: 5,
                unit_price: Money::from_cents(950),
            },
            VolumeTier {
                min_qty: 20,
                unit_price: Money::from_cents(800),
            },
        ]
    }

    fn item(vendor_id: StoreId, subtotal: i64, status: CartItemStatus) -> CartItem {
        CartItem {
            id: CartItemId::new(),
            product_id: ProductId::new(),
            vendor_id,
            product_name: "Widget".to_string(),
            requested_qty: 1,
            quantity: 1,
            moq: 1,
            max_qty: None,
            base_price: Money::from_cents(subtotal),
            unit_price: Money::from_cents(subtotal),
            discount: None,
            subtotal: Money::from_cents(subtotal),
            status,
            warnings: Vec::new(),
        }
    }

    fn promo(vendor_id: StoreId, kind: PromoKind, min_subtotal: i64) -> VendorPromo {
        VendorPromo {
            code: "SAVE".to_string(),
            vendor_id,
            kind,
            min_subtotal: Money::from_cents(min_subtotal),
        }
    }

    #[test]
    fn tier_selection_picks_largest_qualifying_min_qty() {
        let tiers = tiers();
        assert_eq!(select_volume_tier(&tiers, 12).map(|t| t.min_qty), Some(10));
        assert_eq!(select_volume_tier(&tiers, 4), None);
        assert_eq!(select_volume_tier(&tiers, 25).map(|t| t.min_qty), Some(20));
        assert_eq!(select_volume_tier(&tiers, 5).map(|t| t.min_qty), Some(5));
    }

    #[test]
    fn moq_clamp_raises_quantity_with_warning() {
        let (qty, warnings) = normalize_quantity(2, 5, None);
        assert_eq!(qty, 5);
        assert_eq!(
            warnings,
            vec![CartWarning::ClampedToMoq {
                requested: 2,
                moq: 5
            }]
        );
    }

    #[test]
    fn max_clamp_lowers_quantity_with_warning() {
        let (qty, warnings) = normalize_quantity(15, 1, Some(10));
        assert_eq!(qty, 10);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code(), "clamped_to_max");
    }

    #[test]
    fn no_clamp_means_no_warning() {
        let (qty, warnings) = normalize_quantity(7, 5, Some(10));
        assert_eq!(qty, 7);
        assert!(warnings.is_empty());

        let (qty, warnings) = normalize_quantity(5, 5, Some(5));
        assert_eq!(qty, 5);
        assert!(warnings.is_empty());
    }

    #[test]
    fn line_price_uses_tier_price_and_records_saving() {
        let price = price_line(Money::from_cents(1000), &tiers(), 12);
        assert_eq!(price.unit_price.cents(), 900);
        assert_eq!(price.subtotal.cents(), 10_800);
        let discount = price.discount.unwrap();
        assert_eq!(discount.amount.cents(), 1_200);
        assert_eq!(discount.label, "Volume tier 10+");
    }

    #[test]
    fn line_price_without_tier_uses_base_price() {
        let price = price_line(Money::from_cents(1000), &tiers(), 3);
        assert_eq!(price.unit_price.cents(), 1000);
        assert_eq!(price.subtotal.cents(), 3000);
        assert!(price.discount.is_none());
    }

    #[test]
    fn group_subtotal_counts_only_ok_items() {
        let vendor = StoreId::new();
        let ok = item(vendor, 1000, CartItemStatus::Ok);
        let unavailable = item(vendor, 500, CartItemStatus::NotAvailable);
        let group = summarize_vendor_group(vendor, &[&ok, &unavailable], None);

        assert_eq!(group.status, VendorGroupStatus::Ok);
        assert_eq!(group.subtotal.cents(), 1000);
        assert_eq!(group.total.cents(), 1000);
        assert!(group.warnings.is_empty());
    }

    #[test]
    fn group_without_ok_items_is_invalid() {
        let vendor = StoreId::new();
        let invalid = item(vendor, 1000, CartItemStatus::Invalid);
        let group = summarize_vendor_group(vendor, &[&invalid], None);

        assert_eq!(group.status, VendorGroupStatus::Invalid);
        assert_eq!(group.subtotal, Money::zero());
        assert_eq!(group.warnings[0].code(), "vendor_invalid");
    }

    #[test]
    fn percent_promo_discounts_group() {
        let vendor = StoreId::new();
        let ok = item(vendor, 2000, CartItemStatus::Ok);
        let promo = promo(vendor, PromoKind::PercentOff { basis_points: 1000 }, 0);
        let group = summarize_vendor_group(
            vendor,
            &[&ok],
            Some(GroupPromo {
                code: "SAVE",
                promo: Some(&promo),
            }),
        );

        assert_eq!(group.discount.cents(), 200);
        assert_eq!(group.total.cents(), 1800);
        assert_eq!(group.promo_code.as_deref(), Some("SAVE"));
    }

    #[test]
    fn amount_promo_is_capped_at_subtotal() {
        let vendor = StoreId::new();
        let ok = item(vendor, 500, CartItemStatus::Ok);
        let promo = promo(
            vendor,
            PromoKind::AmountOff {
                amount: Money::from_cents(900),
            },
            0,
        );
        let group = summarize_vendor_group(
            vendor,
            &[&ok],
            Some(GroupPromo {
                code: "SAVE",
                promo: Some(&promo),
            }),
        );

        assert_eq!(group.discount.cents(), 500);
        assert_eq!(group.total, Money::zero());
    }

    #[test]
    fn unmet_or_unknown_promo_warns() {
        let vendor = StoreId::new();
        let ok = item(vendor, 500, CartItemStatus::Ok);
        let promo = promo(vendor, PromoKind::PercentOff { basis_points: 500 }, 1000);

        let group = summarize_vendor_group(
            vendor,
            &[&ok],
            Some(GroupPromo {
                code: "SAVE",
                promo: Some(&promo),
            }),
        );
        assert_eq!(group.discount, Money::zero());
        assert_eq!(group.warnings[0].code(), "promo_not_applied");

        let group = summarize_vendor_group(
            vendor,
            &[&ok],
            Some(GroupPromo {
                code: "NOPE",
                promo: None,
            }),
        );
        assert_eq!(group.discount, Money::zero());
        assert_eq!(group.warnings.len(), 1);
    }

    #[test]
    fn cart_totals_are_conserved() {
        let a = StoreId::new();
        let b = StoreId::new();
        let item_a = item(a, 3000, CartItemStatus::Ok);
        let item_b = item(b, 1500, CartItemStatus::Ok);
        let promo_a = promo(a, PromoKind::PercentOff { basis_points: 5000 }, 0);
        let groups = vec![
            summarize_vendor_group(
                a,
                &[&item_a],
                Some(GroupPromo {
                    code: "SAVE",
                    promo: Some(&promo_a),
                }),
            ),
            summarize_vendor_group(b, &[&item_b], None),
        ];

        let totals = cart_totals(&groups);
        let group_sum: Money = groups.iter().map(|g| g.subtotal).sum();
        assert_eq!(totals.subtotal, group_sum);
        assert_eq!(totals.subtotal.cents(), 4500);
        assert_eq!(totals.discount.cents(), 1500);
        assert!(totals.discount <= totals.subtotal);
        assert_eq!(totals.total, totals.subtotal - totals.discount);
    }

    #[test]
    fn vendors_keep_first_appearance_order() {
        let a = StoreId::new();
        let b = StoreId::new();
        let c = StoreId::new();
        assert_eq!(vendors_in_order([&b, &a, &b, &c, &a]), vec![b, a, c]);
    }
}
