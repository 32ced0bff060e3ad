//! Domain events published through the transactional outbox.

use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    CartId, CheckoutGroup, CheckoutGroupId, EventId, OutboxEvent, StoreId, VendorOrderId,
};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the type of aggregate the event describes.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the id of the aggregate the event describes.
    fn aggregate_id(&self) -> uuid::Uuid;

    /// Wraps the event in an outbox record.
    fn to_outbox_event(&self) -> Result<OutboxEvent, serde_json::Error> {
        Ok(OutboxEvent {
            id: EventId::new(),
            event_type: self.event_type().to_string(),
            aggregate_type: self.aggregate_type().to_string(),
            aggregate_id: self.aggregate_id(),
            payload: serde_json::to_value(self)?,
            occurred_at: Utc::now(),
        })
    }
}

/// Emitted once per successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub checkout_group_id: CheckoutGroupId,
    pub buyer_store_id: StoreId,
    pub cart_id: CartId,
    /// Vendor orders in creation order.
    pub vendor_order_ids: Vec<VendorOrderId>,
}

impl OrderCreated {
    pub const EVENT_TYPE: &'static str = "OrderCreated";
    pub const AGGREGATE_TYPE: &'static str = "CheckoutGroup";

    pub fn from_checkout_group(group: &CheckoutGroup) -> Self {
        Self {
            checkout_group_id: group.id,
            buyer_store_id: group.buyer_store_id,
            cart_id: group.cart_id,
            vendor_order_ids: group.vendor_order_ids(),
        }
    }
}

impl DomainEvent for OrderCreated {
    fn event_type(&self) -> &'static str {
        Self::EVENT_TYPE
    }

    fn aggregate_type(&self) -> &'static str {
        Self::AGGREGATE_TYPE
    }

    fn aggregate_id(&self) -> uuid::Uuid {
        self.checkout_group_id.as_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_created_wraps_into_outbox_event() {
        let event = OrderCreated {
            checkout_group_id: CheckoutGroupId::new(),
            buyer_store_id: StoreId::new(),
            cart_id: CartId::new(),
            vendor_order_ids: vec![VendorOrderId::new(), VendorOrderId::new()],
        };

        let outbox = event.to_outbox_event().unwrap();
        assert_eq!(outbox.event_type, "OrderCreated");
        assert_eq!(outbox.aggregate_type, "CheckoutGroup");
        assert_eq!(outbox.aggregate_id, event.checkout_group_id.as_uuid());

        let decoded: OrderCreated = serde_json::from_value(outbox.payload).unwrap();
        assert_eq!(decoded, event);
    }
}
