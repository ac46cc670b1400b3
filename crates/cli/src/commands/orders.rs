//! Order history and user listing.

use marketstall_core::{GUEST_USER_ID, Order, OrderId};
use marketstall_storefront::AppState;
use marketstall_storefront::db::orders::OrderRepository;
use marketstall_storefront::views::{OrderDetailView, OrdersView, UsersView};

use super::{CliError, settle};

fn order_row(order: &Order) -> String {
    format!(
        "{:<48} {:>4} item(s) {:>10}  {}",
        order.id,
        order.total_items,
        order.total_price.display(),
        order.date
    )
}

/// Print the orders of `user`, defaulting to whoever is signed in.
pub async fn list(app: &AppState, user: Option<String>) -> Result<(), CliError> {
    let user = user
        .or_else(|| app.identity().map(|id| id.to_string()))
        .unwrap_or_else(|| GUEST_USER_ID.to_string());

    let view = OrdersView::new(app.clone());
    let orders = settle(view.show(user.clone()).await)?;

    if orders.is_empty() {
        println!("No orders for {user}.");
        return Ok(());
    }
    for order in &orders {
        println!("{}", order_row(order));
    }
    Ok(())
}

/// Print one order with resolved lines and buyer.
pub async fn show(app: &AppState, id: OrderId) -> Result<(), CliError> {
    let view = OrderDetailView::new(app.clone());
    let detail = settle(view.show(id).await)?;

    println!("Order {}", detail.order.id);
    println!("  placed:  {}", detail.order.date);
    println!("  buyer:   {}", detail.buyer.name);
    if !detail.buyer.email.is_empty() {
        println!("  email:   {}", detail.buyer.email);
    }
    for line in &detail.lines {
        println!(
            "{:>5} x {:<32} ({})",
            line.quantity, line.product.title, line.product.id
        );
    }
    println!(
        "Total: {} item(s), {}",
        detail.order.total_items,
        detail.order.total_price.display()
    );
    Ok(())
}

pub async fn delete(app: &AppState, id: &OrderId) -> Result<(), CliError> {
    OrderRepository::new(app.store().as_ref())
        .delete(id)
        .await
        .map_err(marketstall_storefront::AppError::from)?;
    println!("Deleted order {id}");
    Ok(())
}

/// Print every stored user profile.
pub async fn users(app: &AppState) -> Result<(), CliError> {
    let view = UsersView::new(app.clone());
    let profiles = settle(view.refresh().await)?;

    if profiles.is_empty() {
        println!("No users.");
        return Ok(());
    }
    for profile in &profiles {
        let name = if profile.is_complete() {
            profile.name.as_str()
        } else {
            "(no name)"
        };
        println!("{:<32} {:<32} {}", profile.id, profile.email, name);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use marketstall_core::{Cart, Price, ProductId};

    use super::*;

    #[test]
    fn test_order_row_includes_totals_and_date() {
        let mut cart = Cart::new();
        cart.add_item(&ProductId::new("p1"), Price::from_cents(1000));
        cart.add_item(&ProductId::new("p1"), Price::from_cents(1000));
        let placed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let order = Order::snapshot(&cart, None, placed);

        let row = order_row(&order);
        assert!(row.starts_with("guest_2024-03-01T12:00:00.000Z"));
        assert!(row.contains("2 item(s)"));
        assert!(row.contains("$20.00"));
    }
}
