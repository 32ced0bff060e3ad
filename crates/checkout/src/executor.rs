//! Checkout execution.
//!
//! Converts an active cart into a checkout group with one vendor order per
//! vendor. Reservation, order rows, the cart status change and the
//! `OrderCreated` outbox row all share one transaction.

use std::time::Instant;

use chrono::Utc;
use domain::{
    CartId, CartItem, CartItemStatus, CartStatus, CheckoutGroup, CheckoutGroupId,
    CheckoutOptions, CommerceError, DomainEvent, LineItemStatus, Money, OrderCreated,
    OrderLineItem, OrderLineItemId, PaymentIntent, PaymentIntentId, PaymentIntentStatus,
    ReservationRequest, ReservationResult, StoreId, VendorOrder, VendorOrderId, Violation,
};
use persistence::{
    CartRepository, InventoryRepository, OrderRepository, Transaction, TransactionRunner,
};

use crate::error::ResultExt;
use crate::outbox::{OutboxWriter, TransactionalOutbox};
use crate::reservation::reserve_inventory;

/// Runs checkouts against a transactional store.
pub struct CheckoutExecutor<D, O = TransactionalOutbox> {
    db: D,
    outbox: O,
}

impl<D> CheckoutExecutor<D>
where
    D: TransactionRunner,
{
    pub fn new(db: D) -> Self {
        Self::with_outbox(db, TransactionalOutbox)
    }
}

impl<D, O> CheckoutExecutor<D, O>
where
    D: TransactionRunner,
    O: OutboxWriter,
{
    pub fn with_outbox(db: D, outbox: O) -> Self {
        Self { db, outbox }
    }

    /// Checks out the buyer's cart.
    ///
    /// Lines that cannot be reserved become `Rejected` line items, unless
    /// `options.fail_on_shortfall` is set, in which case the checkout fails
    /// with a conflict listing them. Any error leaves no trace in the store.
    #[tracing::instrument(skip(self, options), fields(fail_on_shortfall = options.fail_on_shortfall))]
    pub async fn execute(
        &self,
        buyer_store_id: StoreId,
        cart_id: CartId,
        options: CheckoutOptions,
    ) -> Result<CheckoutGroup, CommerceError> {
        metrics::counter!("checkout_executions_total").increment(1);
        let started = Instant::now();

        let mut tx = self.db.begin().await.context("begin checkout")?;
        let group = match self
            .run(&mut tx, buyer_store_id, cart_id, &options)
            .await
        {
            Ok(group) => group,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "checkout rollback failed");
                }
                metrics::counter!("checkout_failures_total").increment(1);
                tracing::warn!(%cart_id, error = %err, "checkout aborted");
                return Err(err);
            }
        };
        tx.commit().await.context("commit checkout")?;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        tracing::info!(
            checkout_group_id = %group.id,
            vendor_orders = group.vendor_orders.len(),
            duration,
            "checkout completed"
        );
        Ok(group)
    }

    /// Loads a checkout group with its vendor orders.
    pub async fn get_checkout_group(
        &self,
        group_id: CheckoutGroupId,
    ) -> Result<CheckoutGroup, CommerceError> {
        let mut tx = self.db.begin().await.context("begin checkout group read")?;
        let group = tx
            .find_checkout_group(group_id)
            .await
            .context("load checkout group")?;
        tx.commit().await.context("end checkout group read")?;

        group.ok_or_else(|| CommerceError::not_found("Checkout group", group_id))
    }

    async fn run(
        &self,
        tx: &mut D::Tx,
        buyer_store_id: StoreId,
        cart_id: CartId,
        options: &CheckoutOptions,
    ) -> Result<CheckoutGroup, CommerceError> {
        let cart = tx
            .find_cart_for_update(cart_id)
            .await
            .context("load cart")?
            .ok_or_else(|| CommerceError::not_found("Cart", cart_id))?;

        if cart.buyer_store_id != buyer_store_id {
            return Err(CommerceError::Forbidden(format!(
                "cart {cart_id} belongs to another buyer"
            )));
        }
        if !cart.is_active() {
            return Err(CommerceError::conflict(format!(
                "cart {cart_id} is {}",
                cart.status.as_str()
            )));
        }
        let now = Utc::now();
        if cart.is_expired(now) {
            return Err(CommerceError::conflict(format!(
                "cart {cart_id} expired at {}",
                cart.valid_until
            )));
        }
        if cart.items.is_empty() {
            return Err(CommerceError::Validation(format!(
                "cart {cart_id} has no items"
            )));
        }

        let by_vendor = cart.items_by_vendor();
        let lines: Vec<&CartItem> = by_vendor
            .iter()
            .flat_map(|(_, items)| items.iter().copied())
            .collect();
        let results = reserve_lines(&mut *tx, &lines).await?;

        if options.fail_on_shortfall {
            let violations = shortfall_violations(&results);
            if !violations.is_empty() {
                return Err(CommerceError::Conflict {
                    message: format!("{} line(s) could not be reserved", violations.len()),
                    violations,
                });
            }
        }

        let mut group = CheckoutGroup {
            id: CheckoutGroupId::new(),
            buyer_store_id,
            cart_id,
            currency: cart.currency.clone(),
            vendor_orders: Vec::with_capacity(by_vendor.len()),
            created_at: now,
        };
        tx.insert_checkout_group(&group)
            .await
            .context("insert checkout group")?;

        let mut results = results.into_iter();
        for (vendor_id, items) in &by_vendor {
            let order_id = VendorOrderId::new();
            let line_items: Vec<OrderLineItem> = items
                .iter()
                .zip(results.by_ref().take(items.len()))
                .map(|(item, result)| line_item(order_id, item, result))
                .collect();
            let subtotal: Money = line_items
                .iter()
                .filter(|line| line.status == LineItemStatus::Pending)
                .map(OrderLineItem::line_total)
                .sum();

            let order = VendorOrder {
                id: order_id,
                checkout_group_id: group.id,
                vendor_id: *vendor_id,
                subtotal,
                note: options.note.clone(),
                line_items,
                payment_intent: PaymentIntent {
                    id: PaymentIntentId::new(),
                    vendor_order_id: order_id,
                    amount: subtotal,
                    currency: cart.currency.clone(),
                    payment_method: options.payment_method.clone(),
                    status: PaymentIntentStatus::RequiresPayment,
                },
                created_at: now,
            };

            tx.insert_vendor_order(&order)
                .await
                .context("insert vendor order")?;
            tx.insert_line_items(&order.line_items)
                .await
                .context("insert line items")?;
            tx.insert_payment_intent(&order.payment_intent)
                .await
                .context("insert payment intent")?;
            group.vendor_orders.push(order);
        }

        tx.set_cart_status(cart_id, CartStatus::Converted)
            .await
            .context("convert cart")?;

        let event = OrderCreated::from_checkout_group(&group)
            .to_outbox_event()
            .map_err(|e| CommerceError::dependency("serialize OrderCreated", e))?;
        self.outbox.emit(&mut *tx, &event).await?;

        Ok(group)
    }
}

/// Reserves every orderable line in one batch.
///
/// Lines the quote marked `Invalid` stay out of the batch and come back
/// unreserved with reason `invalid_item`. Results follow input order.
async fn reserve_lines<T>(
    tx: &mut T,
    items: &[&CartItem],
) -> Result<Vec<ReservationResult>, CommerceError>
where
    T: InventoryRepository + ?Sized,
{
    let requests: Vec<(ReservationRequest, bool)> = items
        .iter()
        .map(|item| {
            let request = ReservationRequest {
                cart_item_id: item.id,
                product_id: item.product_id,
                quantity: i64::from(item.quantity),
            };
            (request, item.status != CartItemStatus::Invalid)
        })
        .collect();

    let orderable: Vec<ReservationRequest> = requests
        .iter()
        .filter(|(_, orderable)| *orderable)
        .map(|(request, _)| *request)
        .collect();
    let mut reserved = if orderable.is_empty() {
        Vec::new().into_iter()
    } else {
        reserve_inventory(tx, &orderable).await?.into_iter()
    };

    Ok(requests
        .iter()
        .map(|(request, orderable)| {
            if *orderable {
                reserved
                    .next()
                    .unwrap_or_else(|| ReservationResult::insufficient(request))
            } else {
                ReservationResult::invalid(request)
            }
        })
        .collect())
}

fn line_item(
    vendor_order_id: VendorOrderId,
    item: &CartItem,
    result: ReservationResult,
) -> OrderLineItem {
    let status = if result.reserved {
        LineItemStatus::Pending
    } else {
        LineItemStatus::Rejected
    };
    OrderLineItem {
        id: OrderLineItemId::new(),
        vendor_order_id,
        cart_item_id: item.id,
        product_id: item.product_id,
        quantity: item.quantity,
        unit_price: item.unit_price,
        status,
        rejection_reason: result.reason,
    }
}

fn shortfall_violations(results: &[ReservationResult]) -> Vec<Violation> {
    results
        .iter()
        .filter(|r| !r.reserved)
        .map(|r| Violation {
            cart_item_id: Some(r.cart_item_id),
            product_id: r.product_id,
            code: r
                .reason
                .clone()
                .unwrap_or_else(|| domain::INSUFFICIENT_INVENTORY.to_string()),
            message: match r.reason.as_deref() {
                Some(domain::INVALID_ITEM) => "line was invalid at quote time".to_string(),
                _ => format!("insufficient inventory for {} unit(s)", r.quantity),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CartItemId, ProductId};

    fn result(reserved: bool) -> ReservationResult {
        let request = ReservationRequest {
            cart_item_id: CartItemId::new(),
            product_id: ProductId::new(),
            quantity: 4,
        };
        if reserved {
            ReservationResult::reserved(&request)
        } else {
            ReservationResult::insufficient(&request)
        }
    }

    #[test]
    fn violations_list_only_unreserved_lines() {
        let results = vec![result(true), result(false), result(true)];
        let violations = shortfall_violations(&results);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].cart_item_id, Some(results[1].cart_item_id));
        assert_eq!(violations[0].code, "insufficient_inventory");
    }

    #[test]
    fn invalid_lines_report_their_own_code() {
        let request = ReservationRequest {
            cart_item_id: CartItemId::new(),
            product_id: ProductId::new(),
            quantity: 2,
        };
        let violations = shortfall_violations(&[ReservationResult::invalid(&request)]);

        assert_eq!(violations[0].code, "invalid_item");
        assert_eq!(violations[0].message, "line was invalid at quote time");
    }

    #[test]
    fn line_status_follows_reservation() {
        let order_id = VendorOrderId::new();
        let item = CartItem {
            id: CartItemId::new(),
            product_id: ProductId::new(),
            vendor_id: StoreId::new(),
            product_name: "Widget".to_string(),
            requested_qty: 4,
            quantity: 4,
            moq: 1,
            max_qty: None,
            base_price: Money::from_cents(250),
            unit_price: Money::from_cents(250),
            discount: None,
            subtotal: Money::from_cents(1000),
            status: domain::CartItemStatus::Ok,
            warnings: Vec::new(),
        };

        let pending = line_item(order_id, &item, result(true));
        assert_eq!(pending.status, LineItemStatus::Pending);
        assert_eq!(pending.line_total(), Money::from_cents(1000));

        let rejected = line_item(order_id, &item, result(false));
        assert_eq!(rejected.status, LineItemStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("insufficient_inventory")
        );
    }
}
