//! Cart and checkout commands.

use marketstall_core::{Cart, ProductId};
use marketstall_storefront::AppState;
use marketstall_storefront::views::CartView;

use super::{CliError, settle};

fn totals(cart: &Cart) -> String {
    format!(
        "{} item(s), {}",
        cart.total_items(),
        cart.total_price().display()
    )
}

/// Print the cart lines with product details.
pub async fn show(app: &AppState) -> Result<(), CliError> {
    let view = CartView::new(app.clone());
    let summary = settle(view.refresh().await)?;

    if summary.lines.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }
    for line in &summary.lines {
        println!(
            "{:>3} x {:<32} {:>10}  ({})",
            line.quantity,
            line.product.title,
            line.product.price.display(),
            line.product.id
        );
    }
    println!(
        "Total: {} item(s), {}",
        summary.total_items,
        summary.total_price.display()
    );
    Ok(())
}

pub async fn add(app: &AppState, id: &ProductId) -> Result<(), CliError> {
    let cart = app.add_to_cart(id).await?;
    println!("Added {id}. Cart: {}", totals(&cart));
    Ok(())
}

pub async fn remove(app: &AppState, id: &ProductId) -> Result<(), CliError> {
    let cart = app.remove_from_cart(id).await?;
    println!("Removed {id}. Cart: {}", totals(&cart));
    Ok(())
}

/// Place an order as whoever is signed in.
pub async fn checkout(app: &AppState) -> Result<(), CliError> {
    let order = app.checkout().await?;
    println!(
        "Order {} placed: {} item(s), {}",
        order.id,
        order.total_items,
        order.total_price.display()
    );
    Ok(())
}
