//! Outbox rows: events recorded in the same transaction as the state they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EventId;

/// An append-only outbox record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: EventId,

    /// The type of the event (e.g., "OrderCreated").
    pub event_type: String,

    /// The type of aggregate the event describes (e.g., "CheckoutGroup").
    pub aggregate_type: String,

    pub aggregate_id: Uuid,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckoutGroupId;

    #[test]
    fn serializes_with_flat_columns() {
        let group_id = CheckoutGroupId::new();
        let event = OutboxEvent {
            id: EventId::new(),
            event_type: "OrderCreated".to_string(),
            aggregate_type: "CheckoutGroup".to_string(),
            aggregate_id: group_id.as_uuid(),
            payload: serde_json::json!({"ok": true}),
            occurred_at: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "OrderCreated");
        assert_eq!(json["aggregate_id"], serde_json::json!(group_id.as_uuid()));
        assert_eq!(json["payload"]["ok"], true);

        let decoded: OutboxEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, event);
    }
}
