use async_trait::async_trait;
use chrono::Utc;
use domain::{
    AppliedDiscount, Cart, CartId, CartItem, CartItemId, CartItemStatus, CartStatus,
    CartVendorGroup, CartWarning, CheckoutGroup, CheckoutGroupId, EventId, InventoryItem,
    LineItemStatus, Money, OrderLineItem, OrderLineItemId, OutboxEvent, PaymentIntent,
    PaymentIntentId, PaymentIntentStatus, ProductId, StoreId, VendorGroupStatus, VendorOrder,
    VendorOrderId,
};
use sqlx::{
    PgPool, Postgres, Row,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    PersistenceError, Result,
    repository::{
        CartRepository, InventoryRepository, OrderRepository, OutboxRepository, Transaction,
        TransactionRunner,
    },
};

const ACTIVE_CART_INDEX: &str = "uniq_active_cart_per_buyer";

/// PostgreSQL-backed marketplace store.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of up to `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl TransactionRunner for PgDatabase {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        Ok(PgTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

/// An open PostgreSQL transaction. Dropping it uncommitted rolls it back.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_u32(table: &'static str, column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| PersistenceError::CorruptRow {
        table,
        detail: format!("{column} out of range: {value}"),
    })
}

fn parse_status<T>(table: &'static str, raw: &str, parse: fn(&str) -> Option<T>) -> Result<T> {
    parse(raw).ok_or_else(|| PersistenceError::CorruptRow {
        table,
        detail: format!("unknown status: {raw}"),
    })
}

fn row_to_cart(row: &PgRow) -> Result<Cart> {
    let status: String = row.try_get("status")?;
    let shipping_address: Option<serde_json::Value> = row.try_get("shipping_address")?;
    let ad_tokens: serde_json::Value = row.try_get("ad_tokens")?;

    Ok(Cart {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        buyer_store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("buyer_store_id")?),
        status: parse_status("carts", &status, CartStatus::parse)?,
        currency: row.try_get("currency")?,
        shipping_address: shipping_address.map(serde_json::from_value).transpose()?,
        ad_tokens: serde_json::from_value(ad_tokens)?,
        valid_until: row.try_get("valid_until")?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        discount: Money::from_cents(row.try_get("discount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        items: Vec::new(),
        vendor_groups: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    const TABLE: &str = "cart_items";
    let status: String = row.try_get("status")?;
    let discount: Option<serde_json::Value> = row.try_get("discount")?;
    let warnings: serde_json::Value = row.try_get("warnings")?;
    let max_qty: Option<i64> = row.try_get("max_qty")?;

    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        vendor_id: StoreId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
        product_name: row.try_get("product_name")?,
        requested_qty: to_u32(TABLE, "requested_qty", row.try_get("requested_qty")?)?,
        quantity: to_u32(TABLE, "quantity", row.try_get("quantity")?)?,
        moq: to_u32(TABLE, "moq", row.try_get("moq")?)?,
        max_qty: max_qty.map(|v| to_u32(TABLE, "max_qty", v)).transpose()?,
        base_price: Money::from_cents(row.try_get("base_price_cents")?),
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        discount: discount
            .map(serde_json::from_value::<AppliedDiscount>)
            .transpose()?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        status: parse_status(TABLE, &status, CartItemStatus::parse)?,
        warnings: serde_json::from_value::<Vec<CartWarning>>(warnings)?,
    })
}

fn row_to_vendor_group(row: &PgRow) -> Result<CartVendorGroup> {
    let status: String = row.try_get("status")?;
    let warnings: serde_json::Value = row.try_get("warnings")?;

    Ok(CartVendorGroup {
        vendor_id: StoreId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
        promo_code: row.try_get("promo_code")?,
        status: parse_status("cart_vendor_groups", &status, VendorGroupStatus::parse)?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        discount: Money::from_cents(row.try_get("discount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        warnings: serde_json::from_value(warnings)?,
    })
}

fn row_to_line_item(row: &PgRow) -> Result<OrderLineItem> {
    let status: String = row.try_get("status")?;

    Ok(OrderLineItem {
        id: OrderLineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        vendor_order_id: VendorOrderId::from_uuid(row.try_get::<Uuid, _>("vendor_order_id")?),
        cart_item_id: CartItemId::from_uuid(row.try_get::<Uuid, _>("cart_item_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: to_u32("order_line_items", "quantity", row.try_get("quantity")?)?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        status: parse_status("order_line_items", &status, LineItemStatus::parse)?,
        rejection_reason: row.try_get("rejection_reason")?,
    })
}

fn row_to_payment_intent(row: &PgRow) -> Result<PaymentIntent> {
    let status: String = row.try_get("status")?;

    Ok(PaymentIntent {
        id: PaymentIntentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        vendor_order_id: VendorOrderId::from_uuid(row.try_get::<Uuid, _>("vendor_order_id")?),
        amount: Money::from_cents(row.try_get("amount_cents")?),
        currency: row.try_get("currency")?,
        payment_method: row.try_get("payment_method")?,
        status: parse_status("payment_intents", &status, PaymentIntentStatus::parse)?,
    })
}

fn row_to_outbox_event(row: &PgRow) -> Result<OutboxEvent> {
    Ok(OutboxEvent {
        id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
        event_type: row.try_get("event_type")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_id: row.try_get("aggregate_id")?,
        payload: row.try_get("payload")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

impl PgTransaction {
    async fn load_cart(&mut self, cart_id: CartId, lock: &str) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1{lock}"
        ))
        .bind(cart_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => {
                let cart = row_to_cart(&row)?;
                Ok(Some(self.load_cart_children(cart).await?))
            }
            None => Ok(None),
        }
    }

    /// Explains why a guarded cart update touched no row.
    async fn inactive_or_missing(&mut self, cart_id: CartId) -> Result<PersistenceError> {
        let exists = sqlx::query("SELECT 1 FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .is_some();
        Ok(if exists {
            PersistenceError::CartNotActive(cart_id)
        } else {
            PersistenceError::CartNotFound(cart_id)
        })
    }

    async fn load_cart_children(&mut self, mut cart: Cart) -> Result<Cart> {
        let item_rows = sqlx::query(
            r#"
            SELECT id, product_id, vendor_id, product_name, requested_qty, quantity, moq, max_qty,
                   base_price_cents, unit_price_cents, discount, subtotal_cents, status, warnings
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(cart.id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        cart.items = item_rows
            .iter()
            .map(row_to_cart_item)
            .collect::<Result<_>>()?;

        let group_rows = sqlx::query(
            r#"
            SELECT vendor_id, promo_code, status, subtotal_cents, discount_cents, total_cents, warnings
            FROM cart_vendor_groups
            WHERE cart_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(cart.id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        cart.vendor_groups = group_rows
            .iter()
            .map(row_to_vendor_group)
            .collect::<Result<_>>()?;

        Ok(cart)
    }
}

const CART_COLUMNS: &str = "id, buyer_store_id, status, currency, shipping_address, ad_tokens, \
     valid_until, subtotal_cents, discount_cents, total_cents, created_at, updated_at";

#[async_trait]
impl CartRepository for PgTransaction {
    async fn find_active_cart(&mut self, buyer_store_id: StoreId) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE buyer_store_id = $1 AND status = 'active'"
        ))
        .bind(buyer_store_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => {
                let cart = row_to_cart(&row)?;
                Ok(Some(self.load_cart_children(cart).await?))
            }
            None => Ok(None),
        }
    }

    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>> {
        self.load_cart(cart_id, "").await
    }

    async fn find_cart_for_update(&mut self, cart_id: CartId) -> Result<Option<Cart>> {
        self.load_cart(cart_id, " FOR UPDATE").await
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        let shipping_address = cart
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, buyer_store_id, status, currency, shipping_address, ad_tokens,
                               valid_until, subtotal_cents, discount_cents, total_cents,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.buyer_store_id.as_uuid())
        .bind(cart.status.as_str())
        .bind(&cart.currency)
        .bind(shipping_address)
        .bind(serde_json::to_value(&cart.ad_tokens)?)
        .bind(cart.valid_until)
        .bind(cart.subtotal.cents())
        .bind(cart.discount.cents())
        .bind(cart.total.cents())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ACTIVE_CART_INDEX)
            {
                tracing::debug!(buyer_store_id = %cart.buyer_store_id, "active cart already exists");
                return PersistenceError::ActiveCartExists(cart.buyer_store_id);
            }
            PersistenceError::Database(e)
        })?;

        Ok(())
    }

    async fn update_cart(&mut self, cart: &Cart) -> Result<()> {
        let shipping_address = cart
            .shipping_address
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE carts
            SET status = $2, currency = $3, shipping_address = $4, ad_tokens = $5,
                valid_until = $6, subtotal_cents = $7, discount_cents = $8, total_cents = $9,
                updated_at = $10
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.status.as_str())
        .bind(&cart.currency)
        .bind(shipping_address)
        .bind(serde_json::to_value(&cart.ad_tokens)?)
        .bind(cart.valid_until)
        .bind(cart.subtotal.cents())
        .bind(cart.discount.cents())
        .bind(cart.total.cents())
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.inactive_or_missing(cart.id).await?);
        }
        Ok(())
    }

    async fn replace_cart_items(&mut self, cart_id: CartId, items: &[CartItem]) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for item in items {
            let discount = item
                .discount
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO cart_items (id, cart_id, product_id, vendor_id, product_name,
                                        requested_qty, quantity, moq, max_qty, base_price_cents,
                                        unit_price_cents, discount, subtotal_cents, status, warnings)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(cart_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.vendor_id.as_uuid())
            .bind(&item.product_name)
            .bind(i64::from(item.requested_qty))
            .bind(i64::from(item.quantity))
            .bind(i64::from(item.moq))
            .bind(item.max_qty.map(i64::from))
            .bind(item.base_price.cents())
            .bind(item.unit_price.cents())
            .bind(discount)
            .bind(item.subtotal.cents())
            .bind(item.status.as_str())
            .bind(serde_json::to_value(&item.warnings)?)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn replace_vendor_groups(
        &mut self,
        cart_id: CartId,
        groups: &[CartVendorGroup],
    ) -> Result<()> {
        sqlx::query("DELETE FROM cart_vendor_groups WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for group in groups {
            sqlx::query(
                r#"
                INSERT INTO cart_vendor_groups (cart_id, vendor_id, promo_code, status,
                                                subtotal_cents, discount_cents, total_cents, warnings)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(cart_id.as_uuid())
            .bind(group.vendor_id.as_uuid())
            .bind(&group.promo_code)
            .bind(group.status.as_str())
            .bind(group.subtotal.cents())
            .bind(group.discount.cents())
            .bind(group.total.cents())
            .bind(serde_json::to_value(&group.warnings)?)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn set_cart_status(&mut self, cart_id: CartId, status: CartStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE carts SET status = $2, updated_at = $3 WHERE id = $1 AND status = 'active'",
        )
        .bind(cart_id.as_uuid())
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.inactive_or_missing(cart_id).await?);
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for PgTransaction {
    async fn get_inventory(&mut self, product_id: ProductId) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(
            "SELECT product_id, available_qty, reserved_qty FROM inventory_items WHERE product_id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|row| -> Result<InventoryItem> {
            Ok(InventoryItem {
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                available_qty: to_u32(
                    "inventory_items",
                    "available_qty",
                    row.try_get("available_qty")?,
                )?,
                reserved_qty: to_u32(
                    "inventory_items",
                    "reserved_qty",
                    row.try_get("reserved_qty")?,
                )?,
            })
        })
        .transpose()
    }

    async fn upsert_inventory(&mut self, item: &InventoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (product_id, available_qty, reserved_qty, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (product_id) DO UPDATE
            SET available_qty = EXCLUDED.available_qty,
                reserved_qty = EXCLUDED.reserved_qty,
                updated_at = NOW()
            "#,
        )
        .bind(item.product_id.as_uuid())
        .bind(i64::from(item.available_qty))
        .bind(i64::from(item.reserved_qty))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn try_reserve(&mut self, product_id: ProductId, qty: u32) -> Result<bool> {
        // Single conditional update: concurrent reservations cannot oversell.
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET available_qty = available_qty - $2,
                reserved_qty = reserved_qty + $2,
                updated_at = NOW()
            WHERE product_id = $1 AND available_qty >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(qty))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderRepository for PgTransaction {
    async fn insert_checkout_group(&mut self, group: &CheckoutGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkout_groups (id, buyer_store_id, cart_id, currency, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group.id.as_uuid())
        .bind(group.buyer_store_id.as_uuid())
        .bind(group.cart_id.as_uuid())
        .bind(&group.currency)
        .bind(group.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_vendor_order(&mut self, order: &VendorOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vendor_orders (id, checkout_group_id, vendor_id, subtotal_cents, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.checkout_group_id.as_uuid())
        .bind(order.vendor_id.as_uuid())
        .bind(order.subtotal.cents())
        .bind(&order.note)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_line_items(&mut self, items: &[OrderLineItem]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (id, vendor_order_id, cart_item_id, product_id,
                                              quantity, unit_price_cents, status, rejection_reason)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.vendor_order_id.as_uuid())
            .bind(item.cart_item_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.status.as_str())
            .bind(&item.rejection_reason)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_payment_intent(&mut self, intent: &PaymentIntent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_intents (id, vendor_order_id, amount_cents, currency, payment_method, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(intent.id.as_uuid())
        .bind(intent.vendor_order_id.as_uuid())
        .bind(intent.amount.cents())
        .bind(&intent.currency)
        .bind(&intent.payment_method)
        .bind(intent.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_checkout_group(
        &mut self,
        group_id: CheckoutGroupId,
    ) -> Result<Option<CheckoutGroup>> {
        let Some(group_row) = sqlx::query(
            "SELECT id, buyer_store_id, cart_id, currency, created_at FROM checkout_groups WHERE id = $1",
        )
        .bind(group_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let order_rows = sqlx::query(
            r#"
            SELECT id, checkout_group_id, vendor_id, subtotal_cents, note, created_at
            FROM vendor_orders
            WHERE checkout_group_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        let mut vendor_orders = Vec::with_capacity(order_rows.len());
        for row in order_rows {
            let order_id: Uuid = row.try_get("id")?;

            let line_rows = sqlx::query(
                r#"
                SELECT id, vendor_order_id, cart_item_id, product_id, quantity, unit_price_cents,
                       status, rejection_reason
                FROM order_line_items
                WHERE vendor_order_id = $1
                ORDER BY seq ASC
                "#,
            )
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await?;

            let intent_row = sqlx::query(
                r#"
                SELECT id, vendor_order_id, amount_cents, currency, payment_method, status
                FROM payment_intents
                WHERE vendor_order_id = $1
                "#,
            )
            .bind(order_id)
            .fetch_one(&mut *self.tx)
            .await?;

            vendor_orders.push(VendorOrder {
                id: VendorOrderId::from_uuid(order_id),
                checkout_group_id: CheckoutGroupId::from_uuid(
                    row.try_get::<Uuid, _>("checkout_group_id")?,
                ),
                vendor_id: StoreId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
                subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
                note: row.try_get("note")?,
                line_items: line_rows
                    .iter()
                    .map(row_to_line_item)
                    .collect::<Result<_>>()?,
                payment_intent: row_to_payment_intent(&intent_row)?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(Some(CheckoutGroup {
            id: CheckoutGroupId::from_uuid(group_row.try_get::<Uuid, _>("id")?),
            buyer_store_id: StoreId::from_uuid(group_row.try_get::<Uuid, _>("buyer_store_id")?),
            cart_id: CartId::from_uuid(group_row.try_get::<Uuid, _>("cart_id")?),
            currency: group_row.try_get("currency")?,
            vendor_orders,
            created_at: group_row.try_get("created_at")?,
        }))
    }
}

#[async_trait]
impl OutboxRepository for PgTransaction {
    async fn insert_outbox_event(&mut self, event: &OutboxEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, aggregate_type, aggregate_id, payload, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.event_type)
        .bind(&event.aggregate_type)
        .bind(event.aggregate_id)
        .bind(&event.payload)
        .bind(event.occurred_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn outbox_events_for_aggregate(
        &mut self,
        aggregate_id: Uuid,
    ) -> Result<Vec<OutboxEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_type, aggregate_id, payload, occurred_at
            FROM outbox_events
            WHERE aggregate_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(aggregate_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_outbox_event).collect()
    }

    async fn recent_outbox_events(&mut self, limit: usize) -> Result<Vec<OutboxEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_type, aggregate_id, payload, occurred_at
            FROM (
                SELECT seq, id, event_type, aggregate_type, aggregate_id, payload, occurred_at
                FROM outbox_events
                ORDER BY seq DESC
                LIMIT $1
            ) recent
            ORDER BY seq ASC
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_outbox_event).collect()
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
