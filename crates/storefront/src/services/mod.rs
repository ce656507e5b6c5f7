//! Business logic services for storefront.
//!
//! # Services
//!
//! - `pricing` - Line item validation and order totals
//! - `orders` - Order intake: price, publish `order/created`, clear cart
//! - `cart` - Whole-cart reads and replacement
//! - `addresses` - Per-user address book
//! - `products` - Seller product intake with image upload
//! - `media` - Image CDN client
//! - `auth` - Session token verification and seller authorization

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod media;
pub mod orders;
pub mod pricing;
pub mod products;

pub use addresses::{AddressBook, AddressBookError};
pub use cart::{CartStore, CartStoreError};
pub use orders::{OrderError, OrderService, PlacedOrder};
pub use pricing::{LineItemPolicy, PricedOrder, PricingEngine, PricingError};
pub use products::{ProductError, ProductForm, ProductService};
