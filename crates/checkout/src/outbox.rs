//! Transactional outbox emitter.

use async_trait::async_trait;
use domain::{CommerceError, OutboxEvent};
use persistence::{OutboxRepository, Transaction, TransactionRunner};
use uuid::Uuid;

use crate::error::ResultExt;

/// Records an event in the same transaction as the state change it describes.
#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Writes `event` through `tx`. The row exists only if `tx` commits.
    async fn emit(
        &self,
        tx: &mut dyn OutboxRepository,
        event: &OutboxEvent,
    ) -> Result<(), CommerceError>;
}

/// Outbox writer that inserts into the outbox table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionalOutbox;

#[async_trait]
impl OutboxWriter for TransactionalOutbox {
    async fn emit(
        &self,
        tx: &mut dyn OutboxRepository,
        event: &OutboxEvent,
    ) -> Result<(), CommerceError> {
        tx.insert_outbox_event(event)
            .await
            .context("insert outbox event")?;

        metrics::counter!("outbox_events_emitted_total", "event_type" => event.event_type.clone())
            .increment(1);
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            aggregate_id = %event.aggregate_id,
            "outbox event recorded"
        );
        Ok(())
    }
}

/// Reads the outbox rows of one aggregate, oldest first.
pub async fn events_for_aggregate<D>(
    db: &D,
    aggregate_id: Uuid,
) -> Result<Vec<OutboxEvent>, CommerceError>
where
    D: TransactionRunner,
{
    let mut tx = db.begin().await.context("begin outbox read")?;
    let events = tx
        .outbox_events_for_aggregate(aggregate_id)
        .await
        .context("load outbox events")?;
    tx.commit().await.context("end outbox read")?;
    Ok(events)
}

/// Reads the newest `limit` outbox rows, oldest first.
pub async fn recent_events<D>(db: &D, limit: usize) -> Result<Vec<OutboxEvent>, CommerceError>
where
    D: TransactionRunner,
{
    let mut tx = db.begin().await.context("begin outbox read")?;
    let events = tx
        .recent_outbox_events(limit)
        .await
        .context("load outbox events")?;
    tx.commit().await.context("end outbox read")?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CartId, CheckoutGroupId, DomainEvent, OrderCreated, StoreId};
    use persistence::InMemoryDatabase;

    fn order_created() -> OutboxEvent {
        OrderCreated {
            checkout_group_id: CheckoutGroupId::new(),
            buyer_store_id: StoreId::new(),
            cart_id: CartId::new(),
            vendor_order_ids: Vec::new(),
        }
        .to_outbox_event()
        .unwrap()
    }

    #[tokio::test]
    async fn emitted_event_is_visible_after_commit() {
        let db = InMemoryDatabase::new();
        let event = order_created();

        let mut tx = db.begin().await.unwrap();
        TransactionalOutbox.emit(&mut tx, &event).await.unwrap();
        tx.commit().await.unwrap();

        let events = events_for_aggregate(&db, event.aggregate_id).await.unwrap();
        assert_eq!(events, vec![event]);
    }

    #[tokio::test]
    async fn emitted_event_vanishes_on_rollback() {
        let db = InMemoryDatabase::new();
        let event = order_created();

        let mut tx = db.begin().await.unwrap();
        TransactionalOutbox.emit(&mut tx, &event).await.unwrap();
        tx.rollback().await.unwrap();

        assert!(recent_events(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recent_events_keeps_insertion_order() {
        let db = InMemoryDatabase::new();
        let events: Vec<_> = (0..3).map(|_| order_created()).collect();

        let mut tx = db.begin().await.unwrap();
        for event in &events {
            TransactionalOutbox.emit(&mut tx, event).await.unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(recent_events(&db, 2).await.unwrap(), events[1..].to_vec());
    }
}
