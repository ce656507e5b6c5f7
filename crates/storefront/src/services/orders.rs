//! Order intake.
//!
//! Validates the request, prices it against the catalog, publishes one
//! `order/created` event and then empties the caller's cart. Publishing is the
//! commit point: once it succeeds the order is accepted, and a failure to
//! clear the cart is only logged.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use msgrocery_core::{AddressId, EventId, OrderTotal, UserId};

use super::cart::CartStore;
use super::pricing::{PricingEngine, PricingError};
use crate::events::{EventError, EventPublisher, OrderCreated};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Address missing or item list absent or empty.
    #[error("Invalid data")]
    InvalidData,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Event(#[from] EventError),
}

/// Outcome of a successful order placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub event_id: EventId,
    pub total: OrderTotal,
}

#[derive(Clone)]
pub struct OrderService {
    pricing: PricingEngine,
    events: Arc<dyn EventPublisher>,
    carts: CartStore,
}

impl OrderService {
    #[must_use]
    pub fn new(pricing: PricingEngine, events: Arc<dyn EventPublisher>, carts: CartStore) -> Self {
        Self {
            pricing,
            events,
            carts,
        }
    }

    /// Place an order from a raw `{address, items}` body.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidData` when the address is missing or is
    /// not an address id string, or the item list is empty; `Pricing` if an
    /// item cannot be priced or the total is out of range; `Event` if the
    /// event queue is closed. No event is published on error.
    #[instrument(skip(self, body), fields(user_id = %user, order_amount))]
    pub async fn place_order(&self, user: &UserId, body: &Value) -> Result<PlacedOrder, OrderError> {
        let address = body
            .get("address")
            .and_then(Value::as_str)
            .and_then(|a| AddressId::parse(a).ok())
            .ok_or(OrderError::InvalidData)?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .ok_or(OrderError::InvalidData)?;

        let priced = self.pricing.compute_total(items).await.map_err(|e| match e {
            PricingError::NoLineItems => OrderError::InvalidData,
            other => OrderError::Pricing(other),
        })?;
        tracing::Span::current().record("order_amount", tracing::field::display(priced.total.amount));

        let event_id = self
            .events
            .publish(OrderCreated {
                user_id: user.clone(),
                address,
                items: priced.items,
                amount: priced.total.amount,
                date: Utc::now().timestamp_millis(),
            })
            .await?;

        match self.carts.clear(user).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("No user record, cart not cleared"),
            Err(e) => tracing::warn!(error = %e, %event_id, "Failed to clear cart after order"),
        }

        tracing::info!(%event_id, "Order placed");
        Ok(PlacedOrder {
            event_id,
            total: priced.total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;

    use msgrocery_core::{Email, ProductId, UserRole};

    use super::*;
    use crate::db::{MemoryStore, UserRepository};
    use crate::models::{CartItems, NewProduct, UserProfile};
    use crate::services::pricing::LineItemPolicy;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<OrderCreated>>,
    }

    #[async_trait]
    impl EventPublisher for Recorder {
        async fn publish(&self, event: OrderCreated) -> Result<EventId, EventError> {
            self.events.lock().unwrap().push(event);
            Ok(EventId::new_v4())
        }
    }

    struct Fixture {
        store: MemoryStore,
        recorder: Arc<Recorder>,
        service: OrderService,
        user: UserId,
        product: ProductId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = UserId::new("user_1").unwrap();
        store
            .upsert(&UserProfile {
                id: user.clone(),
                email: Email::parse("shopper@example.com").unwrap(),
                name: "Shopper".to_string(),
                image_url: String::new(),
                role: UserRole::Customer,
            })
            .await
            .unwrap();

        let product = ProductId::new_v4();
        store.insert_product(
            NewProduct {
                user_id: UserId::new("user_seller").unwrap(),
                name: "Rice".to_string(),
                description: String::new(),
                category: "Grains".to_string(),
                price: Decimal::from(100),
                offer_price: None,
                image: Vec::new(),
            }
            .into_product(product, Utc::now()),
        );

        let recorder = Arc::new(Recorder::default());
        let repo = Arc::new(store.clone());
        let service = OrderService::new(
            PricingEngine::new(repo.clone(), LineItemPolicy::Skip),
            recorder.clone(),
            CartStore::new(repo),
        );

        Fixture {
            store,
            recorder,
            service,
            user,
            product,
        }
    }

    #[tokio::test]
    async fn test_place_order_publishes_and_clears_cart() {
        let f = fixture().await;
        let cart: CartItems = [(f.product.to_string(), 2)].into_iter().collect();
        f.store.set_cart(&f.user, &cart).await.unwrap();

        let address = AddressId::new_v4();
        let placed = f
            .service
            .place_order(
                &f.user,
                &json!({
                    "address": address.to_string(),
                    "items": [{"product": f.product.to_string(), "quantity": 2}]
                }),
            )
            .await
            .unwrap();

        assert_eq!(placed.total.amount, Decimal::from(204));
        let events = f.recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].address, address);
        assert_eq!(events[0].amount, Decimal::from(204));
        assert!(f.store.user(&f.user).unwrap().cart_items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_address_or_items_is_invalid() {
        let f = fixture().await;
        let item = json!({"product": f.product.to_string(), "quantity": 1});

        for body in [
            json!({"items": [item.clone()]}),
            json!({"address": AddressId::new_v4().to_string(), "items": []}),
            json!({"address": AddressId::new_v4().to_string()}),
            json!({"address": "home", "items": [item.clone()]}),
            json!({"address": {"city": "Bengaluru"}, "items": [item.clone()]}),
            json!({"address": 42, "items": [item.clone()]}),
        ] {
            let err = f.service.place_order(&f.user, &body).await.unwrap_err();
            assert_eq!(err.to_string(), "Invalid data");
        }
        assert!(f.recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_publishes_nothing() {
        let f = fixture().await;
        let missing = ProductId::new_v4();

        let err = f
            .service
            .place_order(
                &f.user,
                &json!({
                    "address": AddressId::new_v4().to_string(),
                    "items": [{"product": missing.to_string(), "quantity": 1}]
                }),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), format!("Product not found for id: {missing}"));
        assert!(f.recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_total_publishes_nothing() {
        let f = fixture().await;

        let err = f
            .service
            .place_order(
                &f.user,
                &json!({
                    "address": AddressId::new_v4().to_string(),
                    "items": [{"product": f.product.to_string(), "quantity": u32::MAX}]
                }),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Pricing(PricingError::AmountOutOfRange)));
        assert!(f.recorder.events.lock().unwrap().is_empty());
    }
}
