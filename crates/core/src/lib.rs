//! Marketstall Core - entity model and cart state machine.
//!
//! This crate provides the types shared by every Marketstall component:
//! - `storefront` - Gateways, services and read-through views
//! - `cli` - Command-line tools for seeding and driving a storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no document store access, no HTTP clients. Persistence of carts and
//! orders lives in the storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and categories
//! - [`entities`] - Product, Cart, User profile and Order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod entities;
pub mod types;

pub use entities::*;
pub use types::*;
