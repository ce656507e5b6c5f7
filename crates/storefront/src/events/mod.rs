//! In-process event transport for `order/created`.
//!
//! Order intake publishes onto a bounded queue; the order consumer drains it
//! in batches (see [`consumer`]). Every published event is assigned an
//! [`EventId`] that travels with all of its deliveries and is stored on the
//! resulting order, so redelivered events are persisted at most once.
//!
//! The queue lives in process memory. Events accepted but not yet persisted
//! are lost if the process dies.

pub mod consumer;
pub mod identity;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use msgrocery_core::{AddressId, EventId, UserId};

use crate::models::OrderLineItem;

/// Name of the order creation event.
pub const ORDER_CREATED: &str = "order/created";

/// Payload of an `order/created` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub user_id: UserId,
    pub address: AddressId,
    pub items: Vec<OrderLineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Placement time, epoch milliseconds.
    pub date: i64,
}

/// One delivery of an event to the consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Idempotency key assigned at publish time.
    pub id: EventId,
    /// 1 for the first delivery, incremented on each redelivery.
    pub attempt: u32,
    pub event: OrderCreated,
}

/// Errors from the event transport.
#[derive(Debug, Error)]
pub enum EventError {
    /// The consumer side has shut down.
    #[error("event queue is closed")]
    Closed,
}

/// Something that accepts `order/created` events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue an event, returning its idempotency key.
    ///
    /// Returns once the event is accepted by the transport.
    async fn publish(&self, event: OrderCreated) -> Result<EventId, EventError>;
}

/// Publishing half of the in-process queue.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Delivery>,
}

/// Consuming half of the in-process queue.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Delivery>,
    redeliver: mpsc::WeakSender<Delivery>,
}

/// Create a bounded queue holding at most `capacity` pending deliveries.
///
/// The stream ends once every [`EventBus`] clone is dropped and the queue is
/// drained.
#[must_use]
pub fn channel(capacity: usize) -> (EventBus, EventStream) {
    let (tx, rx) = mpsc::channel(capacity);
    let redeliver = tx.downgrade();
    (EventBus { tx }, EventStream { rx, redeliver })
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: OrderCreated) -> Result<EventId, EventError> {
        let id = EventId::new_v4();
        // Waits for queue space when the consumer is behind
        self.tx
            .send(Delivery {
                id,
                attempt: 1,
                event,
            })
            .await
            .map_err(|_| EventError::Closed)?;

        tracing::debug!(event_id = %id, event = ORDER_CREATED, "event published");
        Ok(id)
    }
}

impl EventStream {
    /// Wait for the next batch.
    ///
    /// Blocks until one delivery arrives, then collects more until the batch
    /// holds `max_size` deliveries or `window` has elapsed since the first.
    /// Returns `None` once the queue is closed and empty.
    pub async fn next_batch(&mut self, max_size: usize, window: Duration) -> Option<Vec<Delivery>> {
        let first = self.rx.recv().await?;
        let deadline = Instant::now() + window;

        let mut batch = Vec::with_capacity(max_size);
        batch.push(first);

        while batch.len() < max_size {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(delivery)) => batch.push(delivery),
                Ok(None) | Err(_) => break,
            }
        }

        Some(batch)
    }

    /// A sender for putting deliveries back on the queue.
    ///
    /// Returns `None` once every publisher is gone.
    #[must_use]
    pub fn redeliverer(&self) -> Option<mpsc::Sender<Delivery>> {
        self.redeliver.upgrade()
    }
}
