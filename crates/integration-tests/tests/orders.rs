//! Order placement over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use msgrocery_core::UserRole;
use msgrocery_integration_tests::TestApp;
use msgrocery_storefront::models::CartItems;
use msgrocery_storefront::services::LineItemPolicy;

fn address() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn test_order_total_includes_floor_tax() {
    let app = TestApp::new();
    app.add_user("u1", UserRole::Customer);
    let product = app.add_product("Apples", 100, None);
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"address": address(), "items": [{"product": product.to_string(), "quantity": 2}]}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order Placed");
    assert_eq!(body["amount"].as_f64(), Some(204.0));
    assert_eq!(app.events.events().len(), 1);
}

#[tokio::test]
async fn test_order_uses_offer_price() {
    let app = TestApp::new();
    let discounted = app.add_product("Rice", 120, Some(90));
    let regular = app.add_product("Dal", 50, None);
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"address": address(), "items": [
                {"product": discounted.to_string(), "quantity": 1},
                {"product": regular.to_string(), "quantity": 3}
            ]}),
        )
        .await;

    // 90 + 150 + floor(4.8)
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"].as_f64(), Some(244.0));

    let events = app.events.events();
    assert_eq!(events[0].items.len(), 2);
    assert_eq!(events[0].items[1].quantity, 3);
}

#[tokio::test]
async fn test_order_without_address_is_invalid() {
    let app = TestApp::new();
    let product = app.add_product("Milk", 60, None);
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"items": [{"product": product.to_string(), "quantity": 1}]}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "message": "Invalid data"}));
    assert!(app.events.events().is_empty());
}

#[tokio::test]
async fn test_order_with_no_items_is_invalid() {
    let app = TestApp::new();
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json("/api/order/create", Some(&token), &json!({"address": address(), "items": []}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid data");
}

#[tokio::test]
async fn test_unknown_product_publishes_nothing() {
    let app = TestApp::new();
    let known = app.add_product("Bread", 50, None);
    let missing = Uuid::new_v4().to_string();
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"address": address(), "items": [
                {"product": known.to_string(), "quantity": 1},
                {"product": missing, "quantity": 1}
            ]}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], format!("Product not found for id: {missing}"));
    assert!(app.events.events().is_empty());
}

#[tokio::test]
async fn test_malformed_line_item_handling_follows_policy() {
    let items = |product: String| {
        json!({"address": address(), "items": [
            {"product": product, "quantity": 1},
            {"product": "", "quantity": "many"}
        ]})
    };

    let skipping = TestApp::with_policy(LineItemPolicy::Skip);
    let product = skipping.add_product("Eggs", 70, None);
    let (status, body) = skipping
        .post_json("/api/order/create", Some(&TestApp::token("u1")), &items(product.to_string()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"].as_f64(), Some(71.0));

    let rejecting = TestApp::with_policy(LineItemPolicy::Reject);
    let product = rejecting.add_product("Eggs", 70, None);
    let (status, _) = rejecting
        .post_json("/api/order/create", Some(&TestApp::token("u1")), &items(product.to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(rejecting.events.events().is_empty());
}

#[tokio::test]
async fn test_order_clears_cart() {
    let app = TestApp::new();
    let user = app.add_user("u1", UserRole::Customer);
    let product = app.add_product("Butter", 55, None);
    let token = TestApp::token("u1");

    let (status, _) = app
        .post_json(
            "/api/cart/update",
            Some(&token),
            &json!({"cartData": {product.to_string(): 3}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"address": address(), "items": [{"product": product.to_string(), "quantity": 3}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(app.store.user(&user).unwrap().cart_items, CartItems::default());
}

#[tokio::test]
async fn test_order_requires_session() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/api/order/create", None, &json!({"address": address(), "items": []}))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_order_amount_beyond_range_is_rejected() {
    let app = TestApp::new();
    let product = app.add_product("Ghee", 1000, None);
    let token = TestApp::token("u1");

    let (status, body) = app
        .post_json(
            "/api/order/create",
            Some(&token),
            &json!({"address": address(), "items": [{"product": product.to_string(), "quantity": 4_294_967_295_u64}]}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order amount exceeds the maximum allowed");
    assert!(app.events.events().is_empty());
}
