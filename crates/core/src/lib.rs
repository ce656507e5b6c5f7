//! MSgrocery Core - Shared types library.
//!
//! This crate provides the types shared by every MSgrocery component:
//! - `storefront` - Public API for carts, orders, addresses and products
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no database
//! access, no HTTP clients. Order totals are computed here so that the storefront
//! and any offline tooling agree on the tax rule.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, prices and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
