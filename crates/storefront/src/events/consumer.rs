//! Batched order consumer.
//!
//! Drains `order/created` deliveries in batches and persists each batch with
//! one bulk insert, falling back to row-by-row inserts when the bulk insert
//! fails. A failed batch is not retried by the handler; the transport puts
//! every delivery back on the queue after an exponential
//! backoff until it has been delivered `max_attempts` times, after which it is
//! logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Delivery, EventStream};
use crate::config::OrderConfig;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::NewOrder;

const RETRY_BASE_DELAY_SECS: u64 = 5;
const RETRY_MAX_DELAY_SECS: u64 = 60;

/// Processes one batch of deliveries.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    type Error: std::fmt::Display + Send;

    /// Handle a batch, returning the number of records processed.
    async fn handle(&self, batch: &[Delivery]) -> Result<usize, Self::Error>;
}

/// Batching and redelivery settings.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    pub max_size: usize,
    pub window: Duration,
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::from(&OrderConfig::default())
    }
}

impl From<&OrderConfig> for BatchPolicy {
    fn from(config: &OrderConfig) -> Self {
        Self {
            max_size: config.batch_max_size,
            window: config.batch_window,
            max_attempts: config.max_delivery_attempts,
            retry_base: Duration::from_secs(RETRY_BASE_DELAY_SECS),
            retry_max: Duration::from_secs(RETRY_MAX_DELAY_SECS),
        }
    }
}

impl BatchPolicy {
    /// Delay before redelivering after the given failed attempt (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_base
            .saturating_mul(2_u32.pow(exponent))
            .min(self.retry_max)
    }
}

/// Run the consumer until the stream ends.
///
/// Returns after the queue is closed and every pending delivery has been
/// handled, retried or dropped.
pub async fn run_consumer<H: BatchHandler>(mut stream: EventStream, handler: H, policy: BatchPolicy) {
    tracing::info!(
        batch_max_size = policy.max_size,
        batch_window_secs = policy.window.as_secs(),
        "Order consumer started"
    );

    while let Some(batch) = stream.next_batch(policy.max_size, policy.window).await {
        let batch_size = batch.len();
        match handler.handle(&batch).await {
            Ok(processed) => {
                tracing::info!(batch_size, processed, "Order batch persisted");
            }
            Err(e) => {
                tracing::error!(batch_size, error = %e, "Order batch failed");
                schedule_redelivery(&stream, batch, &policy);
            }
        }
    }

    tracing::info!("Event queue closed, order consumer stopped");
}

fn schedule_redelivery(stream: &EventStream, batch: Vec<Delivery>, policy: &BatchPolicy) {
    let Some(tx) = stream.redeliverer() else {
        tracing::error!(dropped = batch.len(), "Event queue closed, dropping failed batch");
        return;
    };

    for mut delivery in batch {
        if delivery.attempt >= policy.max_attempts {
            tracing::error!(
                event_id = %delivery.id,
                attempts = delivery.attempt,
                user_id = %delivery.event.user_id,
                "Order event exhausted delivery attempts, dropping"
            );
            continue;
        }

        let delay = policy.backoff(delivery.attempt);
        delivery.attempt += 1;
        tracing::warn!(
            event_id = %delivery.id,
            attempt = delivery.attempt,
            delay_secs = delay.as_secs(),
            "Scheduling order event redelivery"
        );

        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(delivery).await.is_err() {
                tracing::error!("Event queue closed before redelivery");
            }
        });
    }
}

/// Persists `order/created` deliveries as orders.
#[derive(Clone)]
pub struct OrderConsumer {
    orders: Arc<dyn OrderRepository>,
}

impl OrderConsumer {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Map a delivery to the order it produces.
    #[must_use]
    pub fn project(delivery: &Delivery) -> NewOrder {
        let event = &delivery.event;
        NewOrder {
            event_id: delivery.id,
            user_id: event.user_id.clone(),
            items: event.items.clone(),
            amount: event.amount,
            address: event.address,
            date: event.date,
        }
    }

    async fn insert_each(&self, orders: &[NewOrder]) -> Result<usize, RepositoryError> {
        let mut failure = None;
        let mut stored = 0;

        for order in orders {
            match self.orders.insert_many(std::slice::from_ref(order)).await {
                Ok(_) => stored += 1,
                Err(e) => {
                    tracing::error!(
                        event_id = %order.event_id,
                        user_id = %order.user_id,
                        amount = %order.amount,
                        error = %e,
                        "Order insert failed"
                    );
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => {
                tracing::warn!(stored, failed = orders.len() - stored, "Order batch partially persisted");
                Err(e)
            }
            None => Ok(stored),
        }
    }
}

#[async_trait]
impl BatchHandler for OrderConsumer {
    type Error = RepositoryError;

    /// Persist a batch with one bulk insert.
    ///
    /// If the bulk insert fails, each order is inserted on its own so one bad
    /// record cannot block the rest. Any row that still fails fails the batch,
    /// and redelivery skips the rows already stored.
    #[tracing::instrument(skip_all, fields(batch_size = batch.len()))]
    async fn handle(&self, batch: &[Delivery]) -> Result<usize, RepositoryError> {
        let orders: Vec<NewOrder> = batch.iter().map(Self::project).collect();

        let inserted = match self.orders.insert_many(&orders).await {
            Ok(inserted) => inserted,
            Err(e) => {
                tracing::warn!(error = %e, "Bulk order insert failed, inserting one at a time");
                return self.insert_each(&orders).await;
            }
        };

        if inserted < orders.len() as u64 {
            tracing::info!(
                duplicates = orders.len() as u64 - inserted,
                "Skipped already persisted order events"
            );
        }

        Ok(batch.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;

    use super::super::tests::sample_event;
    use super::super::{EventPublisher, channel};
    use super::*;
    use crate::db::MemoryStore;

    /// Fails the first `failures` batches, then delegates.
    struct Flaky {
        inner: OrderConsumer,
        failures: usize,
        calls: AtomicUsize,
        sizes: Mutex<Vec<usize>>,
    }

    impl Flaky {
        fn new(store: &MemoryStore, failures: usize) -> Self {
            Self {
                inner: OrderConsumer::new(Arc::new(store.clone())),
                failures,
                calls: AtomicUsize::new(0),
                sizes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BatchHandler for Arc<Flaky> {
        type Error = String;

        async fn handle(&self, batch: &[Delivery]) -> Result<usize, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.sizes.lock().unwrap().push(batch.len());
            if call < self.failures {
                return Err("database unavailable".to_string());
            }
            self.inner.handle(batch).await.map_err(|e| e.to_string())
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = BatchPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(2), Duration::from_secs(10));
        assert_eq!(policy.backoff(4), Duration::from_secs(40));
        assert_eq!(policy.backoff(5), Duration::from_secs(60));
        assert_eq!(policy.backoff(30), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_persisted_verbatim() {
        let store = MemoryStore::new();
        let handler = Arc::new(Flaky::new(&store, 0));
        let (bus, stream) = channel(16);

        let mut published = Vec::new();
        for amount in 1..=7 {
            let event = sample_event(amount);
            let id = bus.publish(event.clone()).await.unwrap();
            published.push((id, event));
        }
        drop(bus);

        run_consumer(stream, Arc::clone(&handler), BatchPolicy::default()).await;

        assert_eq!(*handler.sizes.lock().unwrap(), vec![5, 2]);
        let orders = store.orders();
        assert_eq!(orders.len(), 7);
        for (id, event) in published {
            let order = orders.iter().find(|o| o.event_id == id).unwrap();
            assert_eq!(order.amount, event.amount);
            assert_eq!(order.items, event.items);
            assert_eq!(order.address, event.address);
            assert_eq!(order.date, event.date);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_is_redelivered_once_persisted() {
        let store = MemoryStore::new();
        let handler = Arc::new(Flaky::new(&store, 1));
        let (bus, stream) = channel(16);

        let consumer = tokio::spawn(run_consumer(stream, Arc::clone(&handler), BatchPolicy::default()));
        bus.publish(sample_event(204)).await.unwrap();
        bus.publish(sample_event(244)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(bus);
        consumer.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.orders().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_dropped_after_max_attempts() {
        let store = MemoryStore::new();
        let handler = Arc::new(Flaky::new(&store, usize::MAX));
        let policy = BatchPolicy {
            max_attempts: 3,
            ..BatchPolicy::default()
        };
        let (bus, stream) = channel(16);

        let consumer = tokio::spawn(run_consumer(stream, Arc::clone(&handler), policy));
        bus.publish(sample_event(204)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(300)).await;
        drop(bus);
        consumer.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert!(store.orders().is_empty());
    }

    /// Rejects any insert containing an amount the column cannot hold.
    struct NumericColumn {
        store: MemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderRepository for NumericColumn {
        async fn insert_many(&self, orders: &[NewOrder]) -> Result<u64, RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if orders
                .iter()
                .any(|o| !msgrocery_core::is_storable_amount(o.amount))
            {
                return Err(RepositoryError::DataCorruption(
                    "numeric field overflow".to_string(),
                ));
            }
            self.store.insert_many(orders).await
        }
    }

    fn delivery(amount: i64) -> Delivery {
        Delivery {
            id: msgrocery_core::EventId::new_v4(),
            attempt: 1,
            event: sample_event(amount),
        }
    }

    #[tokio::test]
    async fn test_bad_row_does_not_block_rest_of_batch() {
        let store = MemoryStore::new();
        let repo = Arc::new(NumericColumn {
            store: store.clone(),
            calls: AtomicUsize::new(0),
        });
        let consumer = OrderConsumer::new(repo.clone());
        let batch = [delivery(204), delivery(4_380_866_640_900), delivery(244)];

        assert!(consumer.handle(&batch).await.is_err());

        // one bulk attempt, then one insert per row
        assert_eq!(repo.calls.load(Ordering::SeqCst), 4);
        let mut amounts: Vec<_> = store.orders().iter().map(|o| o.amount).collect();
        amounts.sort();
        assert_eq!(amounts, vec![Decimal::from(204), Decimal::from(244)]);

        // redelivery keeps the stored rows single
        assert!(consumer.handle(&batch).await.is_err());
        assert_eq!(store.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_succeeds_when_every_row_fits() {
        struct BulkDown(MemoryStore);

        #[async_trait]
        impl OrderRepository for BulkDown {
            async fn insert_many(&self, orders: &[NewOrder]) -> Result<u64, RepositoryError> {
                if orders.len() > 1 {
                    return Err(RepositoryError::Conflict("bulk insert rejected".to_string()));
                }
                self.0.insert_many(orders).await
            }
        }

        let store = MemoryStore::new();
        let consumer = OrderConsumer::new(Arc::new(BulkDown(store.clone())));

        let processed = consumer
            .handle(&[delivery(204), delivery(244)])
            .await
            .unwrap();

        assert_eq!(processed, 2);
        assert_eq!(store.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_not_duplicated() {
        let store = MemoryStore::new();
        let consumer = OrderConsumer::new(Arc::new(store.clone()));
        let delivery = delivery(204);
        let redelivery = Delivery {
            attempt: 2,
            ..delivery.clone()
        };

        assert_eq!(consumer.handle(&[delivery]).await.unwrap(), 1);
        assert_eq!(consumer.handle(&[redelivery]).await.unwrap(), 1);
        assert_eq!(store.orders().len(), 1);
    }
}
