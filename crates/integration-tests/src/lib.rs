//! Integration test harness for MSgrocery.
//!
//! Builds the full storefront router over [`MemoryStore`] with fake
//! collaborators, so the HTTP contract can be exercised end to end without
//! `PostgreSQL`, the identity provider or the image CDN.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p msgrocery-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use jsonwebtoken::{EncodingKey, Header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use msgrocery_core::{Email, EventId, ProductId, UserId, UserRole};
use msgrocery_storefront::config::{AuthConfig, JwtKey};
use msgrocery_storefront::db::MemoryStore;
use msgrocery_storefront::events::identity::WebhookVerifier;
use msgrocery_storefront::events::{EventError, EventPublisher, OrderCreated};
use msgrocery_storefront::models::{CartItems, Product, User};
use msgrocery_storefront::services::LineItemPolicy;
use msgrocery_storefront::services::auth::{RoleAuthorizer, SessionVerifier};
use msgrocery_storefront::services::media::{ImageUpload, MediaError, MediaStore};
use msgrocery_storefront::state::{AppState, Repositories, Services};

/// HS256 secret shared by the verifier and [`TestApp::token`].
pub const JWT_SECRET: &str = "integration-test-secret";

/// Raw webhook signing key; the configured secret is its base64 form.
pub const WEBHOOK_KEY: &[u8] = b"integration-webhook-key";

/// Publisher that records events instead of queueing them.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<OrderCreated>>,
}

impl RecordingPublisher {
    /// Events published so far.
    #[must_use]
    pub fn events(&self) -> Vec<OrderCreated> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: OrderCreated) -> Result<EventId, EventError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(EventId::new_v4())
    }
}

/// Image store that returns predictable URLs.
#[derive(Debug, Default)]
pub struct FakeMediaStore {
    uploads: Mutex<Vec<String>>,
}

impl FakeMediaStore {
    /// File names uploaded so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload(&self, image: ImageUpload) -> Result<String, MediaError> {
        let url = format!("https://cdn.test/msgrocery/products/{}", image.file_name);
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(image.file_name);
        Ok(url)
    }
}

#[derive(serde::Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: i64,
}

/// A storefront router wired to in-memory parts.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub events: Arc<RecordingPublisher>,
    pub media: Arc<FakeMediaStore>,
}

impl TestApp {
    /// Build an app with an empty store and the default line item policy.
    ///
    /// # Panics
    ///
    /// Panics if the fixed test keys are rejected.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(LineItemPolicy::default())
    }

    /// Build an app with the given line item policy.
    ///
    /// # Panics
    ///
    /// Panics if the fixed test keys are rejected.
    #[must_use]
    pub fn with_policy(line_item_policy: LineItemPolicy) -> Self {
        Self::build(line_item_policy, None)
    }

    /// Build an app that publishes orders to `publisher`.
    ///
    /// [`TestApp::events`] stays empty for such an app.
    ///
    /// # Panics
    ///
    /// Panics if the fixed test keys are rejected.
    #[must_use]
    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::build(LineItemPolicy::default(), Some(publisher))
    }

    fn build(line_item_policy: LineItemPolicy, publisher: Option<Arc<dyn EventPublisher>>) -> Self {
        let store = MemoryStore::new();
        let events = Arc::new(RecordingPublisher::default());
        let publisher = publisher.unwrap_or_else(|| Arc::clone(&events) as Arc<dyn EventPublisher>);
        let media = Arc::new(FakeMediaStore::default());
        let repositories = Repositories::memory(&store);

        let sessions = SessionVerifier::new(&AuthConfig {
            key: JwtKey::Secret(SecretString::from(JWT_SECRET)),
            issuer: None,
        })
        .expect("test JWT key");
        let webhooks = WebhookVerifier::new(&SecretString::from(webhook_secret()))
            .expect("test webhook secret");

        let state = AppState::new(Services {
            sellers: Arc::new(RoleAuthorizer::new(Arc::clone(&repositories.users))),
            repositories,
            events: publisher,
            media: Arc::clone(&media) as Arc<dyn MediaStore>,
            sessions,
            webhooks,
            line_item_policy,
        });

        Self {
            router: msgrocery_storefront::app(state),
            store,
            events,
            media,
        }
    }

    /// Session token for a user, valid for an hour.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails.
    #[must_use]
    pub fn token(user: &str) -> String {
        let claims = Claims {
            sub: user,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .expect("encode test token")
    }

    /// Store a user with an empty cart.
    ///
    /// # Panics
    ///
    /// Panics on an invalid id.
    pub fn add_user(&self, id: &str, role: UserRole) -> UserId {
        let user_id = UserId::new(id).expect("non-empty user id");
        self.store.insert_user(User {
            id: user_id.clone(),
            email: Email::parse(&format!("{id}@example.com")).expect("valid email"),
            name: format!("User {id}"),
            image_url: String::new(),
            role,
            cart_items: CartItems::default(),
        });
        user_id
    }

    /// Store a product and return its id.
    ///
    /// # Panics
    ///
    /// Panics on an invalid seller id.
    pub fn add_product(&self, name: &str, price: i64, offer_price: Option<i64>) -> ProductId {
        let id = ProductId::new_v4();
        self.store.insert_product(Product {
            id,
            user_id: UserId::new("seller").expect("non-empty user id"),
            name: name.to_string(),
            description: String::new(),
            category: "Test".to_string(),
            price: Decimal::from(price),
            offer_price: offer_price.map(Decimal::from),
            image: Vec::new(),
            date: 0,
        });
        id
    }

    /// Send a request and return status plus raw body.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, bytes)
    }

    /// Send a request and return status plus parsed JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(request).await;
        let body = serde_json::from_slice(&bytes).expect("JSON body");
        (status, body)
    }

    /// `GET` with an optional bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    /// `POST` a JSON body with an optional bearer token.
    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a request with optional bearer token and JSON body.
///
/// # Panics
///
/// Panics if the URI is invalid.
#[must_use]
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

/// The configured `whsec_` webhook secret.
#[must_use]
pub fn webhook_secret() -> String {
    format!("whsec_{}", BASE64.encode(WEBHOOK_KEY))
}

/// `v1,` signature header value for a webhook delivery.
///
/// # Panics
///
/// Never in practice; HMAC accepts keys of any length.
#[must_use]
pub fn sign_webhook(msg_id: &str, timestamp: i64, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_KEY).expect("HMAC key");
    mac.update(format!("{msg_id}.{timestamp}.{body}").as_bytes());
    format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
}
