use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Cart, CartId, CartItem, CartStatus, CartVendorGroup, CheckoutGroup, CheckoutGroupId,
    InventoryItem, Money, OrderLineItem, OutboxEvent, PaymentIntent, ProductId, StoreId,
    VendorOrder, VendorOrderId,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    PersistenceError, Result,
    repository::{
        CartRepository, InventoryRepository, OrderRepository, OutboxRepository, Transaction,
        TransactionRunner,
    },
};

/// Operations that can be made to fail on purpose in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ReplaceCartItems,
    InsertVendorOrder,
    InsertLineItems,
    InsertPaymentIntent,
    InsertOutboxEvent,
    Commit,
}

/// Number of rows per table, for atomicity assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub carts: usize,
    pub cart_items: usize,
    pub vendor_groups: usize,
    pub checkout_groups: usize,
    pub vendor_orders: usize,
    pub line_items: usize,
    pub payment_intents: usize,
    pub outbox_events: usize,
}

#[derive(Debug, Clone)]
struct CheckoutGroupRow {
    id: CheckoutGroupId,
    buyer_store_id: StoreId,
    cart_id: CartId,
    currency: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct VendorOrderRow {
    id: VendorOrderId,
    checkout_group_id: CheckoutGroupId,
    vendor_id: StoreId,
    subtotal: Money,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    /// Cart rows; `items` and `vendor_groups` are kept empty here.
    carts: HashMap<CartId, Cart>,
    cart_items: HashMap<CartId, Vec<CartItem>>,
    vendor_groups: HashMap<CartId, Vec<CartVendorGroup>>,
    inventory: HashMap<ProductId, InventoryItem>,
    checkout_groups: Vec<CheckoutGroupRow>,
    vendor_orders: Vec<VendorOrderRow>,
    line_items: Vec<OrderLineItem>,
    payment_intents: Vec<PaymentIntent>,
    outbox: Vec<OutboxEvent>,
}

impl MemoryState {
    fn load_cart(&self, cart_id: CartId) -> Option<Cart> {
        let mut cart = self.carts.get(&cart_id)?.clone();
        cart.items = self.cart_items.get(&cart_id).cloned().unwrap_or_default();
        cart.vendor_groups = self.vendor_groups.get(&cart_id).cloned().unwrap_or_default();
        Some(cart)
    }

    fn load_checkout_group(&self, group_id: CheckoutGroupId) -> Option<CheckoutGroup> {
        let row = self.checkout_groups.iter().find(|g| g.id == group_id)?;
        let vendor_orders = self
            .vendor_orders
            .iter()
            .filter(|o| o.checkout_group_id == group_id)
            .filter_map(|o| {
                let payment_intent = self
                    .payment_intents
                    .iter()
                    .find(|p| p.vendor_order_id == o.id)?
                    .clone();
                Some(VendorOrder {
                    id: o.id,
                    checkout_group_id: o.checkout_group_id,
                    vendor_id: o.vendor_id,
                    subtotal: o.subtotal,
                    note: o.note.clone(),
                    line_items: self
                        .line_items
                        .iter()
                        .filter(|l| l.vendor_order_id == o.id)
                        .cloned()
                        .collect(),
                    payment_intent,
                    created_at: o.created_at,
                })
            })
            .collect();

        Some(CheckoutGroup {
            id: row.id,
            buyer_store_id: row.buyer_store_id,
            cart_id: row.cart_id,
            currency: row.currency.clone(),
            vendor_orders,
            created_at: row.created_at,
        })
    }
}

/// In-memory store for testing.
///
/// Transactions are serialized: `begin` waits for any open transaction to
/// finish, takes a snapshot of the data, and restores it unless the
/// transaction commits.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<AsyncMutex<MemoryState>>,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl InMemoryDatabase {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of the given operation fail until cleared.
    pub fn fail_on(&self, point: FailPoint) {
        self.fail_points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(point);
    }

    pub fn clear_fail_points(&self) {
        self.fail_points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Seeds or overwrites a stock row outside of any caller transaction.
    pub async fn seed_inventory(&self, item: InventoryItem) {
        self.state
            .lock()
            .await
            .inventory
            .insert(item.product_id, item);
    }

    pub async fn inventory(&self, product_id: ProductId) -> Option<InventoryItem> {
        self.state.lock().await.inventory.get(&product_id).copied()
    }

    pub async fn row_counts(&self) -> RowCounts {
        let state = self.state.lock().await;
        RowCounts {
            carts: state.carts.len(),
            cart_items: state.cart_items.values().map(Vec::len).sum(),
            vendor_groups: state.vendor_groups.values().map(Vec::len).sum(),
            checkout_groups: state.checkout_groups.len(),
            vendor_orders: state.vendor_orders.len(),
            line_items: state.line_items.len(),
            payment_intents: state.payment_intents.len(),
            outbox_events: state.outbox.len(),
        }
    }

    /// Returns every outbox event in insertion order.
    pub async fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.state.lock().await.outbox.clone()
    }
}

#[async_trait]
impl TransactionRunner for InMemoryDatabase {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            snapshot: Some(snapshot),
            fail_points: self.fail_points.clone(),
        })
    }
}

/// An open in-memory transaction holding exclusive access to the store.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// State at `begin`; restored on drop unless the transaction committed.
    snapshot: Option<MemoryState>,
    fail_points: Arc<Mutex<HashSet<FailPoint>>>,
}

impl InMemoryTransaction {
    fn check(&self, point: FailPoint) -> Result<()> {
        let armed = self
            .fail_points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&point);
        if armed {
            tracing::debug!(?point, "fail point triggered");
            return Err(PersistenceError::Unavailable(format!(
                "fail point {point:?} triggered"
            )));
        }
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            tracing::trace!("rolling back in-memory transaction");
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryTransaction {
    async fn find_active_cart(&mut self, buyer_store_id: StoreId) -> Result<Option<Cart>> {
        let cart_id = self
            .guard
            .carts
            .values()
            .find(|c| c.buyer_store_id == buyer_store_id && c.status == CartStatus::Active)
            .map(|c| c.id);
        Ok(cart_id.and_then(|id| self.guard.load_cart(id)))
    }

    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>> {
        Ok(self.guard.load_cart(cart_id))
    }

    async fn find_cart_for_update(&mut self, cart_id: CartId) -> Result<Option<Cart>> {
        // Transactions already hold the whole store exclusively.
        Ok(self.guard.load_cart(cart_id))
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        let has_active = self
            .guard
            .carts
            .values()
            .any(|c| c.buyer_store_id == cart.buyer_store_id && c.status == CartStatus::Active);
        if has_active && cart.status == CartStatus::Active {
            return Err(PersistenceError::ActiveCartExists(cart.buyer_store_id));
        }

        let mut row = cart.clone();
        row.items.clear();
        row.vendor_groups.clear();
        self.guard.carts.insert(cart.id, row);
        Ok(())
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<()> {
        let row = self
            .guard
            .carts
            .get_mut(&cart.id)
            .ok_or(PersistenceError::CartNotFound(cart.id))?;
        if row.status != CartStatus::Active {
            return Err(PersistenceError::CartNotActive(cart.id));
        }
        let mut updated = cart.clone();
        updated.items.clear();
        updated.vendor_groups.clear();
        *row = updated;
        Ok(())
    }

    async fn replace_cart_items(&mut self, cart_id: CartId, items: &[CartItem]) -> Result<()> {
        self.check(FailPoint::ReplaceCartItems)?;
        self.guard.cart_items.insert(cart_id, items.to_vec());
        Ok(())
    }

    async fn replace_vendor_groups(
        &mut self,
        cart_id: CartId,
        groups: &[CartVendorGroup],
    ) -> Result<()> {
        self.guard.vendor_groups.insert(cart_id, groups.to_vec());
        Ok(())
    }

    async fn set_cart_status(&mut self, cart_id: CartId, status: CartStatus) -> Result<()> {
        let row = self
            .guard
            .carts
            .get_mut(&cart_id)
            .ok_or(PersistenceError::CartNotFound(cart_id))?;
        if row.status != CartStatus::Active {
            return Err(PersistenceError::CartNotActive(cart_id));
        }
        row.status = status;
        row.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for InMemoryTransaction {
    async fn get_inventory(&mut self, product_id: ProductId) -> Result<Option<InventoryItem>> {
        Ok(self.guard.inventory.get(&product_id).copied())
    }

    async fn upsert_inventory(&mut self, item: &InventoryItem) -> Result<()> {
        self.guard.inventory.insert(item.product_id, *item);
        Ok(())
    }

    async fn try_reserve(&mut self, product_id: ProductId, qty: u32) -> Result<bool> {
        Ok(self
            .guard
            .inventory
            .get_mut(&product_id)
            .is_some_and(|item| item.try_reserve(qty)))
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn insert_checkout_group(&mut self, group: &CheckoutGroup) -> Result<()> {
        self.guard.checkout_groups.push(CheckoutGroupRow {
            id: group.id,
            buyer_store_id: group.buyer_store_id,
            cart_id: group.cart_id,
            currency: group.currency.clone(),
            created_at: group.created_at,
        });
        Ok(())
    }

    async fn insert_vendor_order(&mut self, order: &VendorOrder) -> Result<()> {
        self.check(FailPoint::InsertVendorOrder)?;
        self.guard.vendor_orders.push(VendorOrderRow {
            id: order.id,
            checkout_group_id: order.checkout_group_id,
            vendor_id: order.vendor_id,
            subtotal: order.subtotal,
            note: order.note.clone(),
            created_at: order.created_at,
        });
        Ok(())
    }

    async fn insert_line_items(&mut self, items: &[OrderLineItem]) -> Result<()> {
        self.check(FailPoint::InsertLineItems)?;
        self.guard.line_items.extend_from_slice(items);
        Ok(())
    }

    async fn insert_payment_intent(&mut self, intent: &PaymentIntent) -> Result<()> {
        self.check(FailPoint::InsertPaymentIntent)?;
        self.guard.payment_intents.push(intent.clone());
        Ok(())
    }

    async fn find_checkout_group(
        &mut self,
        group_id: CheckoutGroupId,
    ) -> Result<Option<CheckoutGroup>> {
        Ok(self.guard.load_checkout_group(group_id))
    }
}

#[async_trait]
impl OutboxRepository for InMemoryTransaction {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<()> {
        self.check(FailPoint::InsertOutboxEvent)?;
        self.guard.outbox.push(event.clone());
        Ok(())
    }

    async fn outbox_events_for_aggregate(
        &mut self,
        aggregate_id: Uuid,
    ) -> Result<Vec<OutboxEvent>> {
        Ok(self
            .guard
            .outbox
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }

    async fn recent_outbox_events(&mut self, limit: usize) -> Result<Vec<OutboxEvent>> {
        let skip = self.guard.outbox.len().saturating_sub(limit);
        Ok(self.guard.outbox[skip..].to_vec())
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(mut self) -> Result<()> {
        self.check(FailPoint::Commit)?;
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}
