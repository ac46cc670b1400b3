//! Storefront records: what lives in each document collection.
//!
//! Document ids are carried outside the document body by the store, so every
//! entity marks its `id` with `#[serde(skip)]` and repositories attach it
//! after decoding.

pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartLine, CartState};
pub use order::{GUEST_USER_ID, Order};
pub use product::{DraftError, Product, ProductDraft, UNKNOWN_PRODUCT_TITLE};
pub use user::{GUEST_SHOPPER_NAME, UserProfile};
