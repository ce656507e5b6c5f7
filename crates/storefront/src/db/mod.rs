//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Users mirrored from the identity provider, with their cart
//! - `product` - Seller-listed catalog products
//! - `address` - Delivery addresses, many per user
//! - `order` - Orders written by the order consumer, unique per `event_id`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p msgrocery-cli -- migrate
//! ```
//!
//! # Backends
//!
//! Each table is accessed through a repository trait. The `Pg*` types are the
//! production implementations; [`MemoryStore`] implements every trait over
//! in-process maps and backs the integration tests.

pub mod addresses;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use msgrocery_core::{ProductId, ProductPrice, UserId, UserRole};

use crate::models::{Address, CartItems, NewAddress, NewOrder, NewProduct, Product, UserProfile};

pub use addresses::PgAddressRepository;
pub use memory::MemoryStore;
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Users and their embedded carts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Cart of a user, or `None` if the user does not exist.
    async fn get_cart(&self, id: &UserId) -> Result<Option<CartItems>, RepositoryError>;

    /// Replace a user's cart. Returns `false` if the user does not exist.
    async fn set_cart(&self, id: &UserId, cart: &CartItems) -> Result<bool, RepositoryError>;

    /// Role of a user, or `None` if the user does not exist.
    async fn get_role(&self, id: &UserId) -> Result<Option<UserRole>, RepositoryError>;

    /// Insert a user or overwrite the profile of an existing one.
    ///
    /// The cart of an existing user is left untouched.
    async fn upsert(&self, profile: &UserProfile) -> Result<(), RepositoryError>;

    /// Overwrite the profile of an existing user. Returns `false` if absent.
    async fn update(&self, profile: &UserProfile) -> Result<bool, RepositoryError>;

    /// Delete a user. Returns `false` if absent.
    async fn delete(&self, id: &UserId) -> Result<bool, RepositoryError>;
}

/// Catalog products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Current price of a product, or `None` if it does not exist.
    async fn find_price(&self, id: ProductId) -> Result<Option<ProductPrice>, RepositoryError>;

    /// Store a new product.
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;
}

/// Delivery addresses.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Store a new address for a user.
    async fn create(&self, user_id: &UserId, address: NewAddress)
    -> Result<Address, RepositoryError>;

    /// All addresses of a user, oldest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError>;
}

/// Persisted orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a batch of orders in one statement.
    ///
    /// Orders whose `event_id` is already stored are skipped. Returns the
    /// number of rows actually inserted.
    async fn insert_many(&self, orders: &[NewOrder]) -> Result<u64, RepositoryError>;
}
