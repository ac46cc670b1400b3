//! Orders: frozen snapshots of a checked-out cart.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::cart::Cart;
use crate::types::{AccountId, OrderId, Price, ProductId};

/// `userId` recorded for orders placed without signing in.
pub const GUEST_USER_ID: &str = "guest";

/// A placed order.
///
/// Quantities and totals are copied out of the cart at checkout, so later
/// catalog edits never change what an order says was bought or paid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(skip)]
    pub id: OrderId,
    /// Account id of the buyer, or [`GUEST_USER_ID`].
    pub user_id: String,
    pub products: BTreeMap<ProductId, u32>,
    pub total_items: u32,
    pub total_price: Price,
    /// ISO-8601 timestamp with millisecond precision, UTC.
    pub date: String,
}

impl Order {
    /// Snapshot `cart` as an order placed by `account` at `placed_at`.
    ///
    /// The id is derived as `{userId}_{date}`.
    #[must_use]
    pub fn snapshot(cart: &Cart, account: Option<&AccountId>, placed_at: DateTime<Utc>) -> Self {
        let user_id = account.map_or_else(|| GUEST_USER_ID.to_owned(), ToString::to_string);
        let date = placed_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            id: OrderId::new(format!("{user_id}_{date}")),
            user_id,
            products: cart.products().clone(),
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            date,
        }
    }

    /// Whether the order was placed by a guest.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.user_id == GUEST_USER_ID
    }

    /// Buyer account, if the order was not placed by a guest.
    #[must_use]
    pub fn account(&self) -> Option<AccountId> {
        (!self.is_guest() && !self.user_id.is_empty()).then(|| AccountId::new(&self.user_id))
    }

    /// Parsed order date, when the stored string is valid RFC 3339.
    #[must_use]
    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_item(&ProductId::new("p1"), Price::from_cents(1000));
        cart.add_item(&ProductId::new("p1"), Price::from_cents(1000));
        cart
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_guest_snapshot() {
        let order = Order::snapshot(&cart(), None, noon());
        assert_eq!(order.user_id, "guest");
        assert!(order.is_guest());
        assert_eq!(order.account(), None);
        assert_eq!(order.date, "2024-05-01T12:00:00.000Z");
        assert_eq!(order.id.as_str(), "guest_2024-05-01T12:00:00.000Z");
        assert_eq!(order.products.get(&ProductId::new("p1")), Some(&2));
        assert_eq!(order.total_items, 2);
        assert_eq!(order.total_price, Price::from_cents(2000));
    }

    #[test]
    fn test_account_snapshot() {
        let uid = AccountId::new("uid-7");
        let order = Order::snapshot(&cart(), Some(&uid), noon());
        assert_eq!(order.user_id, "uid-7");
        assert_eq!(order.account(), Some(uid));
        assert_eq!(order.placed_at(), Some(noon()));
    }

    #[test]
    fn test_snapshot_is_independent_of_cart() {
        let mut cart = cart();
        let order = Order::snapshot(&cart, None, noon());
        cart.checkout();
        assert_eq!(order.total_items, 2);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_document_shape() {
        let order = Order::snapshot(&cart(), None, noon());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["userId"], "guest");
        assert_eq!(json["totalItems"], 2);
        assert!(json.get("id").is_none());
    }
}
