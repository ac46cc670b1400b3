//! Seed the catalog from a JSON file.
//!
//! The file holds an array of product drafts:
//!
//! ```json
//! [
//!   {
//!     "title": "Trail Runner",
//!     "image": "https://cdn.example.com/trail.png",
//!     "price": 89.9,
//!     "description": "Lightweight running shoe",
//!     "category": "shoes"
//!   }
//! ]
//! ```
//!
//! Every draft is validated before the first product is written.

use std::path::Path;

use tracing::{error, info};

use marketstall_core::ProductDraft;
use marketstall_storefront::AppState;

use super::CliError;

/// Parse and validate drafts, listing every rejected entry.
fn parse_drafts(path: &Path, content: &str) -> Result<Vec<ProductDraft>, CliError> {
    let drafts: Vec<ProductDraft> =
        serde_json::from_str(content).map_err(|source| CliError::CatalogFile {
            path: path.to_path_buf(),
            source,
        })?;

    let mut valid = Vec::with_capacity(drafts.len());
    let mut rejected = 0;
    for (index, draft) in drafts.into_iter().enumerate() {
        let title = draft.title.clone();
        match draft.validate() {
            Ok(draft) => valid.push(draft),
            Err(e) => {
                error!(index, title = %title, "  - {e}");
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        return Err(CliError::InvalidProducts(rejected));
    }
    Ok(valid)
}

/// Create every product in `file`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry fails
/// validation, or a write fails.
pub async fn catalog(app: &AppState, file: &Path) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| CliError::Read {
            path: file.to_path_buf(),
            source,
        })?;

    let drafts = parse_drafts(file, &content)?;
    info!(path = %file.display(), products = drafts.len(), "Seeding catalog");

    for draft in drafts {
        let product = app.catalog().create(draft).await?;
        println!("{}  {}", product.id, product.title);
    }

    info!("Seeding completed");
    Ok(())
}
