//! Quote pipeline and cart persistence.
//!
//! A quote validates the buyer, resolves every referenced vendor once, prices
//! each line, groups lines by vendor and then replaces the buyer's active cart
//! in a single transaction. Item-level problems never fail a quote; they show
//! up as item statuses and warnings.

use std::collections::HashMap;

use chrono::Utc;
use domain::pricing::{
    GroupPromo, cart_totals, normalize_quantity, price_line, summarize_vendor_group,
    vendors_in_order,
};
use domain::{
    Cart, CartId, CartItem, CartItemId, CartItemStatus, CartStatus, CartVendorGroup, CartWarning,
    CommerceError, Money, ProductId, ProductLookup, PromoLookup, QuoteItemRequest, QuoteRequest,
    StoreId, StoreLookup, StoreProfile, StoreType,
};
use persistence::{CartRepository, Transaction, TransactionRunner};

use crate::config::CartConfig;
use crate::error::ResultExt;

/// Builds quotes and owns the buyer's active cart.
pub struct CartService<D, L> {
    db: D,
    lookups: L,
    config: CartConfig,
}

impl<D, L> CartService<D, L>
where
    D: TransactionRunner,
    L: ProductLookup + StoreLookup + PromoLookup,
{
    pub fn new(db: D, lookups: L, config: CartConfig) -> Self {
        Self {
            db,
            lookups,
            config,
        }
    }

    /// Prices `request` for the buyer and stores the result as the buyer's active cart.
    ///
    /// Re-quoting replaces the cart's items and vendor groups wholesale and
    /// pushes `valid_until` forward by the configured TTL.
    #[tracing::instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn quote_cart(
        &self,
        buyer_store_id: StoreId,
        request: QuoteRequest,
    ) -> Result<Cart, CommerceError> {
        metrics::counter!("cart_quotes_total").increment(1);

        let buyer = self.validate_buyer(buyer_store_id).await?;
        validate_request(&request)?;
        let buyer_state = buyer.state().ok_or_else(|| {
            CommerceError::Validation(format!("buyer {buyer_store_id} has no resolvable state"))
        })?;

        let vendor_rejections = self.resolve_vendors(&request, buyer_state).await?;

        let mut tx = self.db.begin().await.context("begin quote")?;
        let existing = tx
            .find_active_cart(buyer_store_id)
            .await
            .context("load active cart")?;
        let previous_prices = existing
            .as_ref()
            .map(Cart::price_index)
            .unwrap_or_default();

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let rejection = vendor_rejections
                .get(&line.vendor_store_id)
                .and_then(Option::as_deref);
            items.push(self.price_item(line, rejection, &previous_prices).await?);
        }

        let vendor_groups = self.build_vendor_groups(&items, &request).await?;
        let totals = cart_totals(&vendor_groups);

        let now = Utc::now();
        let cart = Cart {
            id: existing.as_ref().map_or_else(CartId::new, |c| c.id),
            buyer_store_id,
            status: CartStatus::Active,
            currency: self.config.currency.clone(),
            shipping_address: buyer.address.clone(),
            ad_tokens: request.ad_tokens.clone(),
            valid_until: now + self.config.ttl,
            subtotal: totals.subtotal,
            discount: totals.discount,
            total: totals.total,
            items,
            vendor_groups,
            created_at: existing.as_ref().map_or(now, |c| c.created_at),
            updated_at: now,
        };

        if existing.is_some() {
            tx.update_cart(&cart).await.context("update cart")?;
        } else {
            tx.insert_cart(&cart).await.context("insert cart")?;
        }
        tx.replace_cart_items(cart.id, &cart.items)
            .await
            .context("replace cart items")?;
        tx.replace_vendor_groups(cart.id, &cart.vendor_groups)
            .await
            .context("replace vendor groups")?;
        tx.commit().await.context("commit quote")?;

        tracing::info!(
            cart_id = %cart.id,
            total = %cart.total,
            vendors = cart.vendor_groups.len(),
            "cart quoted"
        );
        Ok(cart)
    }

    /// Returns the buyer's active cart.
    #[tracing::instrument(skip(self))]
    pub async fn get_active_cart(&self, buyer_store_id: StoreId) -> Result<Cart, CommerceError> {
        let mut tx = self.db.begin().await.context("begin cart read")?;
        let cart = tx
            .find_active_cart(buyer_store_id)
            .await
            .context("load active cart")?;
        tx.commit().await.context("end cart read")?;

        cart.ok_or_else(|| CommerceError::not_found("Active cart", buyer_store_id))
    }

    async fn validate_buyer(&self, buyer_store_id: StoreId) -> Result<StoreProfile, CommerceError> {
        let buyer = self
            .lookups
            .get_by_id(buyer_store_id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Store", buyer_store_id))?;

        if buyer.store_type != StoreType::Buyer {
            return Err(CommerceError::Forbidden(format!(
                "store {buyer_store_id} is not a buyer"
            )));
        }
        if !buyer.is_kyc_verified() {
            return Err(CommerceError::Forbidden(format!(
                "buyer {buyer_store_id} is not KYC verified"
            )));
        }
        Ok(buyer)
    }

    /// Looks up each distinct vendor once. Maps vendor id to its rejection reason, if any.
    async fn resolve_vendors(
        &self,
        request: &QuoteRequest,
        buyer_state: &str,
    ) -> Result<HashMap<StoreId, Option<String>>, CommerceError> {
        let mut rejections = HashMap::new();
        for vendor_id in vendors_in_order(request.items.iter().map(|i| &i.vendor_store_id)) {
            let rejection = match self.lookups.get_by_id(vendor_id).await? {
                Some(vendor) => vendor.vendor_rejection(buyer_state),
                None => Some("vendor store not found".to_string()),
            };
            if let Some(reason) = &rejection {
                tracing::debug!(%vendor_id, reason = %reason, "vendor rejected");
            }
            rejections.insert(vendor_id, rejection);
        }
        Ok(rejections)
    }

    async fn price_item(
        &self,
        line: &QuoteItemRequest,
        vendor_rejection: Option<&str>,
        previous_prices: &HashMap<(ProductId, StoreId), Money>,
    ) -> Result<CartItem, CommerceError> {
        let mut status = CartItemStatus::Ok;
        let mut warnings = Vec::new();
        if let Some(reason) = vendor_rejection {
            status = CartItemStatus::Invalid;
            warnings.push(CartWarning::VendorInvalid {
                reason: reason.to_string(),
            });
        }

        let Some((product, owner)) = self.lookups.get_product_detail(line.product_id).await?
        else {
            warnings.push(CartWarning::ProductNotFound);
            return Ok(CartItem {
                id: CartItemId::new(),
                product_id: line.product_id,
                vendor_id: line.vendor_store_id,
                product_name: String::new(),
                requested_qty: line.quantity,
                quantity: line.quantity,
                moq: 1,
                max_qty: None,
                base_price: Money::zero(),
                unit_price: Money::zero(),
                discount: None,
                subtotal: Money::zero(),
                status: CartItemStatus::Invalid,
                warnings,
            });
        };

        let vendor_matches = owner.id == line.vendor_store_id;
        if !vendor_matches {
            status = status.escalate(CartItemStatus::Invalid);
            warnings.push(CartWarning::VendorMismatch {
                requested_vendor: line.vendor_store_id,
                owning_vendor: owner.id,
            });
        }

        let (quantity, clamp_warnings) =
            normalize_quantity(line.quantity, product.moq, product.max_qty);
        warnings.extend(clamp_warnings);

        if vendor_matches {
            if !product.is_active {
                status = status.escalate(CartItemStatus::NotAvailable);
                warnings.push(CartWarning::ProductInactive);
            } else if product.available_qty < quantity {
                status = status.escalate(CartItemStatus::NotAvailable);
                warnings.push(CartWarning::InsufficientInventory {
                    available: product.available_qty,
                    requested: quantity,
                });
            }
        }

        let price = price_line(product.base_price, &product.volume_tiers, quantity);
        if let Some(previous) = previous_prices.get(&(line.product_id, line.vendor_store_id))
            && *previous != price.unit_price
        {
            warnings.push(CartWarning::PriceChanged {
                previous: *previous,
                current: price.unit_price,
            });
        }

        Ok(CartItem {
            id: CartItemId::new(),
            product_id: product.id,
            vendor_id: line.vendor_store_id,
            product_name: product.name,
            requested_qty: line.quantity,
            quantity,
            moq: product.moq,
            max_qty: product.max_qty,
            base_price: product.base_price,
            unit_price: price.unit_price,
            discount: price.discount,
            subtotal: price.subtotal,
            status,
            warnings,
        })
    }

    async fn build_vendor_groups(
        &self,
        items: &[CartItem],
        request: &QuoteRequest,
    ) -> Result<Vec<CartVendorGroup>, CommerceError> {
        let mut groups = Vec::new();
        for vendor_id in vendors_in_order(items.iter().map(|i| &i.vendor_id)) {
            let vendor_items: Vec<&CartItem> =
                items.iter().filter(|i| i.vendor_id == vendor_id).collect();

            let group = match request.promo_codes.get(&vendor_id) {
                Some(code) => {
                    let promo = self.lookups.get_vendor_promo(vendor_id, code).await?;
                    summarize_vendor_group(
                        vendor_id,
                        &vendor_items,
                        Some(GroupPromo {
                            code,
                            promo: promo.as_ref(),
                        }),
                    )
                }
                None => summarize_vendor_group(vendor_id, &vendor_items, None),
            };
            groups.push(group);
        }
        Ok(groups)
    }
}

fn validate_request(request: &QuoteRequest) -> Result<(), CommerceError> {
    if request.items.is_empty() {
        return Err(CommerceError::Validation(
            "quote must contain at least one item".to_string(),
        ));
    }
    if let Some(line) = request.items.iter().find(|line| line.quantity == 0) {
        return Err(CommerceError::Validation(format!(
            "quantity for product {} must be positive",
            line.product_id
        )));
    }
    Ok(())
}
