//! Orders placed over HTTP flow through the queue into storage.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use msgrocery_core::OrderStatus;
use msgrocery_integration_tests::TestApp;
use msgrocery_storefront::events::consumer::{BatchPolicy, OrderConsumer, run_consumer};
use msgrocery_storefront::events::{self, EventPublisher};

#[tokio::test(start_paused = true)]
async fn test_placed_orders_are_persisted_in_batches() {
    let (bus, stream) = events::channel(64);
    let app = TestApp::with_publisher(Arc::new(bus) as Arc<dyn EventPublisher>);
    let product = app.add_product("Tea", 250, Some(200));
    let store = app.store.clone();

    let consumer = tokio::spawn(run_consumer(
        stream,
        OrderConsumer::new(Arc::new(store.clone())),
        BatchPolicy::default(),
    ));

    let address = Uuid::new_v4().to_string();
    for n in 1..=7 {
        let token = TestApp::token(&format!("u{n}"));
        let (status, _) = app
            .post_json(
                "/api/order/create",
                Some(&token),
                &json!({"address": address, "items": [{"product": product.to_string(), "quantity": n}]}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // Dropping the app drops the last publisher, which ends the stream.
    drop(app);
    consumer.await.unwrap();

    let orders = store.orders();
    assert_eq!(orders.len(), 7);
    for order in &orders {
        assert_eq!(order.status, OrderStatus::OrderPlaced);
        assert_eq!(order.address.to_string(), address);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product, product);
    }

    let three = orders
        .iter()
        .find(|o| o.user_id.as_str() == "u3")
        .unwrap();
    // 600 + floor(12)
    assert_eq!(three.amount, rust_decimal::Decimal::from(612));
}
