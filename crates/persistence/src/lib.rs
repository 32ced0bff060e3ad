//! Transactional persistence for the marketplace checkout core.
//!
//! Every mutating operation runs inside exactly one [`Transaction`] obtained
//! from a [`TransactionRunner`]. A transaction that is dropped without
//! [`Transaction::commit`] is rolled back, so a failed checkout never leaves
//! partial rows behind.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use error::{PersistenceError, Result};
pub use memory::{FailPoint, InMemoryDatabase, InMemoryTransaction, RowCounts};
pub use postgres::{PgDatabase, PgTransaction};
pub use repository::{
    CartRepository, InventoryRepository, OrderRepository, OutboxRepository, Transaction,
    TransactionRunner,
};
