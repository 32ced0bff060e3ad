use async_trait::async_trait;
use domain::{
    Cart, CartId, CartItem, CartStatus, CartVendorGroup, CheckoutGroup, CheckoutGroupId,
    InventoryItem, OrderLineItem, OutboxEvent, PaymentIntent, ProductId, StoreId, VendorOrder,
};
use uuid::Uuid;

use crate::Result;

/// Cart aggregate storage. A cart owns its items and vendor groups.
#[async_trait]
pub trait CartRepository: Send {
    /// Loads the buyer's single active cart with items and groups, if any.
    async fn find_active_cart(&mut self, buyer_store_id: StoreId) -> Result<Option<Cart>>;

    /// Loads a cart with items and groups, regardless of status.
    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Like [`find_cart`](CartRepository::find_cart), but holds a row lock on
    /// the cart until the transaction ends. Checkout reads through this so two
    /// checkouts of one cart run one after the other.
    async fn find_cart_for_update(&mut self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Inserts the cart row only; items and groups are written by the replace methods.
    ///
    /// Fails with `ActiveCartExists` if the buyer already has an active cart.
    async fn insert_cart(&mut self, cart: &Cart) -> Result<()>;

    /// Updates the cart row (status, totals, snapshot fields, validity); children untouched.
    ///
    /// Only an active cart can be updated. Fails with `CartNotActive` once the
    /// stored row has left `Active`, so a stale quote cannot revive a converted cart.
    async fn update_cart(&mut self, cart: &Cart) -> Result<()>;

    /// Deletes every item of the cart and inserts `items` in order.
    async fn replace_cart_items(&mut self, cart_id: CartId, items: &[CartItem]) -> Result<()>;

    /// Deletes every vendor group of the cart and inserts `groups` in order.
    async fn replace_vendor_groups(
        &mut self,
        cart_id: CartId,
        groups: &[CartVendorGroup],
    ) -> Result<()>;

    /// Moves an active cart to `status`. Fails with `CartNotActive` otherwise.
    async fn set_cart_status(&mut self, cart_id: CartId, status: CartStatus) -> Result<()>;
}

/// Inventory storage. Only the reservation engine should call [`try_reserve`].
///
/// [`try_reserve`]: InventoryRepository::try_reserve
#[async_trait]
pub trait InventoryRepository: Send {
    async fn get_inventory(&mut self, product_id: ProductId) -> Result<Option<InventoryItem>>;

    /// Creates or overwrites the stock row for a product.
    async fn upsert_inventory(&mut self, item: &InventoryItem) -> Result<()>;

    /// Conditionally moves `qty` units from available to reserved.
    ///
    /// Returns false, changing nothing, when fewer than `qty` units are
    /// available or the product has no stock row.
    async fn try_reserve(&mut self, product_id: ProductId, qty: u32) -> Result<bool>;
}

/// Checkout group storage. Rows are written one level at a time.
#[async_trait]
pub trait OrderRepository: Send {
    /// Inserts the checkout group row only.
    async fn insert_checkout_group(&mut self, group: &CheckoutGroup) -> Result<()>;

    /// Inserts the vendor order row only.
    async fn insert_vendor_order(&mut self, order: &VendorOrder) -> Result<()>;

    async fn insert_line_items(&mut self, items: &[OrderLineItem]) -> Result<()>;

    async fn insert_payment_intent(&mut self, intent: &PaymentIntent) -> Result<()>;

    /// Loads a checkout group with vendor orders, line items and payment intents.
    async fn find_checkout_group(
        &mut self,
        group_id: CheckoutGroupId,
    ) -> Result<Option<CheckoutGroup>>;
}

/// Append-only outbox storage.
#[async_trait]
pub trait OutboxRepository: Send {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<()>;

    /// Returns the events recorded for an aggregate, oldest first.
    async fn outbox_events_for_aggregate(&mut self, aggregate_id: Uuid)
    -> Result<Vec<OutboxEvent>>;

    /// Returns the most recent `limit` events, oldest first.
    async fn recent_outbox_events(&mut self, limit: usize) -> Result<Vec<OutboxEvent>>;
}

/// A unit of atomicity spanning every repository.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// rolls it back.
#[async_trait]
pub trait Transaction:
    CartRepository + InventoryRepository + OrderRepository + OutboxRepository + Send
{
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Starts transactions against a backing store.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx>;
}
