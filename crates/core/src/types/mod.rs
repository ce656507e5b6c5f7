//! Core types for MSgrocery.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{AMOUNT_SCALE, MAX_AMOUNT, OrderTotal, ProductPrice, TAX_RATE, is_storable_amount, tax_on};
pub use status::*;
