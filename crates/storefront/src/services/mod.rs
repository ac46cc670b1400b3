//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Product reads (cached) and edits
//! - `cart` - Cart persistence and serialized mutations
//! - `checkout` - Order placement and cart reset
//! - `account` - Registration, sign-in, profiles

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use account::AccountService;
pub use cart::{CartService, CartStorage, PersistFailurePolicy};
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
