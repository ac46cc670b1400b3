//! Catalog browsing and removal.

use marketstall_core::{Category, Product, ProductId};
use marketstall_storefront::AppState;
use marketstall_storefront::views::{CatalogView, ProductDetailView};

use super::{CliError, settle};

fn product_row(product: &Product) -> String {
    format!(
        "{:<24} {:>10}  {:<18} {}",
        product.id,
        product.price.display(),
        product.category,
        product.title
    )
}

/// Print the catalog, optionally filtered to one category.
pub async fn list(app: &AppState, category: Option<Category>) -> Result<(), CliError> {
    let view = CatalogView::new(app.clone());
    let products = settle(view.show(category).await)?;

    if products.is_empty() {
        println!("No products.");
        return Ok(());
    }
    for product in &products {
        println!("{}", product_row(product));
    }
    Ok(())
}

/// Print one product. Unknown ids show the placeholder.
pub async fn show(app: &AppState, id: ProductId) -> Result<(), CliError> {
    let view = ProductDetailView::new(app.clone());
    let product = settle(view.show(id).await)?;

    println!("{}", product.title);
    println!("  id:          {}", product.id);
    println!("  price:       {}", product.price.display());
    if !product.category.is_empty() {
        println!("  category:    {}", product.category);
    }
    if !product.image.is_empty() {
        println!("  image:       {}", product.image);
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

pub async fn delete(app: &AppState, id: &ProductId) -> Result<(), CliError> {
    app.catalog().delete(id).await?;
    println!("Deleted product {id}");
    Ok(())
}
