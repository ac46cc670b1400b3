//! The shopping cart state machine.
//!
//! A cart maps product ids to quantities and keeps running totals. Totals
//! are accumulated from the unit price passed with each mutation; they are
//! never recomputed from the catalog.
//!
//! ```text
//!            add_item                 add_item / remove_item
//!   Empty  ───────────▶  NonEmpty  ◀──────────────────────────┐
//!     ▲                    │  │                                │
//!     │  remove last item  │  └────────────────────────────────┘
//!     └────────────────────┤
//!     └──── checkout ──────┘
//! ```
//!
//! Invariants held by every transition:
//! - `total_items` equals the sum of all quantities
//! - no product is present with quantity 0
//! - an empty cart has a total price of exactly zero

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Price, ProductId};

/// Coarse state of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartState {
    Empty,
    NonEmpty,
}

/// One product entry of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Owning account, when the cart is persisted remotely. Guests have none.
    #[serde(skip)]
    pub id: Option<AccountId>,
    products: BTreeMap<ProductId, u32>,
    total_items: u32,
    #[serde(default)]
    total_price: Price,
}

impl Cart {
    /// An empty cart with no owner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty cart owned by `account`.
    #[must_use]
    pub fn for_account(account: Option<AccountId>) -> Self {
        Self {
            id: account,
            ..Self::default()
        }
    }

    /// Add one unit of `product_id` at `unit_price`.
    pub fn add_item(&mut self, product_id: &ProductId, unit_price: Price) {
        let quantity = self.products.entry(product_id.clone()).or_insert(0);
        *quantity = quantity.saturating_add(1);
        self.total_items = self.total_items.saturating_add(1);
        self.total_price = self.total_price + unit_price;
    }

    /// Remove one unit of `product_id` at `unit_price`.
    ///
    /// Returns `false` (and leaves the cart untouched) when the product is
    /// not in the cart or its quantity is already zero.
    pub fn remove_item(&mut self, product_id: &ProductId, unit_price: Price) -> bool {
        let Some(quantity) = self.products.get_mut(product_id).filter(|q| **q > 0) else {
            return false;
        };
        *quantity -= 1;
        if *quantity == 0 {
            self.products.remove(product_id);
        }
        self.total_items = self.total_items.saturating_sub(1);
        self.total_price = if self.products.is_empty() {
            Price::ZERO
        } else {
            self.total_price.saturating_sub(unit_price)
        };
        true
    }

    /// Empty the cart after a successful checkout. The owner is kept.
    pub fn checkout(&mut self) {
        self.products.clear();
        self.total_items = 0;
        self.total_price = Price::ZERO;
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        if self.products.is_empty() {
            CartState::Empty
        } else {
            CartState::NonEmpty
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Quantity of one product, zero when absent.
    #[must_use]
    pub fn quantity(&self, product_id: &ProductId) -> u32 {
        self.products.get(product_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn total_items(&self) -> u32 {
        self.total_items
    }

    #[must_use]
    pub const fn total_price(&self) -> Price {
        self.total_price
    }

    /// The product → quantity mapping.
    #[must_use]
    pub const fn products(&self) -> &BTreeMap<ProductId, u32> {
        &self.products
    }

    /// Entries in product id order.
    pub fn lines(&self) -> impl Iterator<Item = CartLine<'_>> {
        self.products.iter().map(|(product_id, &quantity)| CartLine {
            product_id,
            quantity,
        })
    }

    /// Whether the invariants hold. Carts built through this API always
    /// satisfy them; decoded documents may not.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let sum: u64 = self.products.values().map(|&q| u64::from(q)).sum();
        !self.products.values().any(|&q| q == 0)
            && sum == u64::from(self.total_items)
            && (!self.products.is_empty() || self.total_price.is_zero())
    }

    /// Repair a decoded cart: drop zero-quantity entries, recompute
    /// `total_items` and clear the price of an empty cart.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.products.retain(|_, q| *q > 0);
        let sum: u64 = self.products.values().map(|&q| u64::from(q)).sum();
        self.total_items = u32::try_from(sum).unwrap_or(u32::MAX);
        if self.products.is_empty() {
            self.total_price = Price::ZERO;
        }
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p1() -> ProductId {
        ProductId::new("p1")
    }

    fn ten() -> Price {
        Price::from_cents(1000)
    }

    #[test]
    fn test_add_twice_accumulates() {
        let mut cart = Cart::new();
        cart.add_item(&p1(), ten());
        cart.add_item(&p1(), ten());

        assert_eq!(cart.quantity(&p1()), 2);
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Price::from_cents(2000));
        assert_eq!(cart.state(), CartState::NonEmpty);
    }

    #[test]
    fn test_remove_down_to_empty() {
        let mut cart = Cart::new();
        cart.add_item(&p1(), ten());
        cart.add_item(&p1(), ten());

        assert!(cart.remove_item(&p1(), ten()));
        assert_eq!(cart.quantity(&p1()), 1);
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total_price(), ten());

        assert!(cart.remove_item(&p1(), ten()));
        assert!(cart.products().is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Price::ZERO);
        assert_eq!(cart.state(), CartState::Empty);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&p1(), ten());
        let before = cart.clone();

        assert!(!cart.remove_item(&ProductId::new("p2"), ten()));
        assert_eq!(cart, before);

        let mut empty = Cart::new();
        assert!(!empty.remove_item(&p1(), ten()));
        assert_eq!(empty, Cart::new());
    }

    #[test]
    fn test_checkout_always_empties() {
        let mut cart = Cart::for_account(Some(AccountId::new("uid-1")));
        cart.add_item(&p1(), ten());
        cart.add_item(&ProductId::new("p2"), Price::from_cents(250));
        cart.checkout();

        assert!(cart.products().is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), Price::ZERO);
        assert_eq!(cart.id, Some(AccountId::new("uid-1")));
    }

    #[test]
    fn test_invariants_hold_over_mixed_sequence() {
        let ids: Vec<ProductId> = ["a", "b", "c"].into_iter().map(ProductId::new).collect();
        let mut cart = Cart::new();
        // Deterministic pseudo-random walk of adds and removes.
        let mut seed = 7_u32;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = &ids[(seed >> 8) as usize % ids.len()];
            let price = Price::from_cents(100 + (seed >> 16) % 900);
            if (seed >> 4) % 3 == 0 {
                cart.remove_item(id, price);
            } else {
                cart.add_item(id, price);
            }
            assert!(cart.is_consistent(), "inconsistent cart: {cart:?}");
            assert!(cart.products().values().all(|&q| q > 0));
        }
    }

    #[test]
    fn test_document_shape() {
        let mut cart = Cart::for_account(Some(AccountId::new("uid-1")));
        cart.add_item(&p1(), ten());
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"products": {"p1": 1}, "totalItems": 1, "totalPrice": 10.0})
        );
    }

    #[test]
    fn test_normalized_repairs_decoded_cart() {
        let cart: Cart = serde_json::from_str(
            r#"{"products":{"p1":2,"p2":0},"totalItems":9,"totalPrice":20}"#,
        )
        .unwrap();
        assert!(!cart.is_consistent());

        let cart = cart.normalized();
        assert!(cart.is_consistent());
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.quantity(&ProductId::new("p2")), 0);
    }

    #[test]
    fn test_add_saturates_at_quantity_limit() {
        let mut cart: Cart = serde_json::from_str(&format!(
            r#"{{"products":{{"p1":{max}}},"totalItems":{max},"totalPrice":10}}"#,
            max = u32::MAX
        ))
        .unwrap();

        cart.add_item(&p1(), ten());

        assert_eq!(cart.quantity(&p1()), u32::MAX);
        assert_eq!(cart.total_items(), u32::MAX);
    }
}
