//! Catalog products.

use serde::{Deserialize, Serialize};

use crate::types::{Category, Price, ProductId};

/// Title shown for a product id that no longer resolves.
pub const UNKNOWN_PRODUCT_TITLE: &str = "Unknown Product";

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// Store-assigned document id.
    #[serde(skip)]
    pub id: ProductId,
    pub title: String,
    /// Image URL.
    pub image: String,
    pub price: Price,
    pub description: String,
    /// Stored category value. Free text in the document; the whitelist is
    /// enforced when drafts are validated.
    pub category: String,
}

impl Product {
    /// Stand-in for a product that cannot be found.
    ///
    /// Dangling references (a cart or order line for a deleted product) render
    /// with this instead of failing the whole view.
    #[must_use]
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            title: UNKNOWN_PRODUCT_TITLE.to_owned(),
            ..Self::default()
        }
    }

    /// Whether this is the [`Product::placeholder`] stand-in.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.title == UNKNOWN_PRODUCT_TITLE && self.price.is_zero() && self.description.is_empty()
    }

    /// Whether the product belongs to `category`.
    #[must_use]
    pub fn in_category(&self, category: Category) -> bool {
        self.category.eq_ignore_ascii_case(category.as_str())
    }

    /// The editable fields of this product.
    #[must_use]
    pub fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            title: self.title.clone(),
            image: self.image.clone(),
            price: self.price,
            description: self.description.clone(),
            category: self.category.clone(),
        }
    }
}

/// Reasons a [`ProductDraft`] is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Category(#[from] crate::types::CategoryError),
}

/// Product fields submitted on create or edit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub title: String,
    pub image: String,
    pub price: Price,
    pub description: String,
    pub category: String,
}

impl ProductDraft {
    /// Check required fields and normalize the category to its stored form.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::MissingField` for a blank title, description or
    /// image, and `DraftError::Category` for a category outside the whitelist.
    pub fn validate(mut self) -> Result<Self, DraftError> {
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("image", &self.image),
        ] {
            if value.trim().is_empty() {
                return Err(DraftError::MissingField(name));
            }
        }
        let category: Category = self.category.parse()?;
        self.category = category.as_str().to_owned();
        self.title = self.title.trim().to_owned();
        Ok(self)
    }

    /// Attach a store-assigned id.
    #[must_use]
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            title: self.title,
            image: self.image,
            price: self.price,
            description: self.description,
            category: self.category,
        }
    }
}
