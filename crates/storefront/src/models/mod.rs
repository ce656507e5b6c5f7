//! Domain models for storefront.
//!
//! These types are the validated domain objects passed between routes,
//! services and repositories. Their serde representation is the JSON wire
//! format of the public API (camelCase fields, `_id` for record ids).

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, AddressInput, NewAddress};
pub use order::{NewOrder, Order, OrderLineItem};
pub use product::{NewProduct, Product};
pub use user::{CartError, CartItems, User, UserProfile};
