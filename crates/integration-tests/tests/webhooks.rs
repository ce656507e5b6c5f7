//! Identity webhook delivery over HTTP.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};

use msgrocery_core::{UserId, UserRole};
use msgrocery_integration_tests::{TestApp, sign_webhook};

fn delivery(body: &Value, signature: Option<String>) -> Request<Body> {
    let payload = body.to_string();
    let timestamp = chrono::Utc::now().timestamp();
    let signature = signature.unwrap_or_else(|| sign_webhook("msg_1", timestamp, &payload));

    Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .header("svix-id", "msg_1")
        .header("svix-timestamp", timestamp.to_string())
        .header("svix-signature", signature)
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .unwrap()
}

fn user_event(kind: &str, first_name: &str, role: Option<&str>) -> Value {
    json!({
        "type": kind,
        "data": {
            "id": "user_2abc",
            "email_addresses": [{"email_address": "asha@example.com"}],
            "first_name": first_name,
            "last_name": "Rao",
            "image_url": "https://img.test/asha.png",
            "public_metadata": role.map_or_else(|| json!({}), |r| json!({"role": r}))
        }
    })
}

#[tokio::test]
async fn test_unsigned_delivery_is_rejected() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/identity")
        .body(Body::from(user_event("user.created", "Asha", None).to_string()))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_signature_is_rejected() {
    let app = TestApp::new();
    let forged = sign_webhook("msg_1", chrono::Utc::now().timestamp(), "{}");

    let (status, body) = app
        .send(delivery(&user_event("user.created", "Asha", None), Some(forged)))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(app.store.user(&UserId::new("user_2abc").unwrap()).is_none());
}

#[tokio::test]
async fn test_user_lifecycle() {
    let app = TestApp::new();
    let id = UserId::new("user_2abc").unwrap();

    let (status, body) = app
        .send(delivery(&user_event("user.created", "Asha", None), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let user = app.store.user(&id).unwrap();
    assert_eq!(user.name, "Asha Rao");
    assert_eq!(user.email.as_str(), "asha@example.com");
    assert_eq!(user.role, UserRole::Customer);
    assert!(user.cart_items.is_empty());

    let (status, _) = app
        .send(delivery(&user_event("user.updated", "Ashwini", Some("seller")), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let user = app.store.user(&id).unwrap();
    assert_eq!(user.name, "Ashwini Rao");
    assert_eq!(user.role, UserRole::Seller);

    let deleted = json!({"type": "user.deleted", "data": {"id": "user_2abc", "deleted": true}});
    let (status, _) = app.send(delivery(&deleted, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.user(&id).is_none());
}

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged() {
    let app = TestApp::new();
    let event = json!({"type": "session.created", "data": {"id": "sess_1"}});

    let (status, body) = app.send(delivery(&event, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}
