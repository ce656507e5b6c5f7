//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Cart (requires auth)
//! GET  /api/cart/get           - Current cart
//! POST /api/cart/update        - Replace cart
//!
//! # Orders (requires auth)
//! POST /api/order/create       - Price and place an order
//!
//! # Addresses (requires auth)
//! POST /api/user/add-address   - Save a delivery address
//! GET  /api/user/get-address   - List saved addresses
//!
//! # Products (requires seller)
//! POST /api/product/add        - Multipart product listing with images
//!
//! # Webhooks (signed)
//! POST /api/webhooks/identity  - Identity provider user lifecycle events
//! ```

pub mod addresses;
pub mod cart;
pub mod health;
pub mod orders;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Upper bound on a product listing upload (all images together).
const PRODUCT_UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/get", get(cart::get))
        .route("/update", post(cart::update))
}

/// Create the user address routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/add-address", post(addresses::add))
        .route("/get-address", get(addresses::list))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new().route(
        "/add",
        post(products::add).layer(DefaultBodyLimit::max(PRODUCT_UPLOAD_LIMIT_BYTES)),
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/cart", cart_routes())
        .route("/api/order/create", post(orders::create))
        .nest("/api/user", user_routes())
        .nest("/api/product", product_routes())
        .route("/api/webhooks/identity", post(webhooks::identity))
}
