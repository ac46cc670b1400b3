//! Fixed product category whitelist.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A category outside the whitelist.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// Product categories accepted by the catalog.
///
/// Stored lowercase in product documents (`"women's clothing"`), displayed
/// title-cased (`"Women's Clothing"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "shoes")]
    Shoes,
    #[serde(rename = "skincare")]
    Skincare,
    #[serde(rename = "women's clothing")]
    WomensClothing,
    #[serde(rename = "men's clothing")]
    MensClothing,
    #[serde(rename = "technology")]
    Technology,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Shoes,
        Self::Skincare,
        Self::WomensClothing,
        Self::MensClothing,
        Self::Technology,
    ];

    /// Value stored in the product document.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Shoes => "shoes",
            Self::Skincare => "skincare",
            Self::WomensClothing => "women's clothing",
            Self::MensClothing => "men's clothing",
            Self::Technology => "technology",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Shoes => "Shoes",
            Self::Skincare => "Skincare",
            Self::WomensClothing => "Women's Clothing",
            Self::MensClothing => "Men's Clothing",
            Self::Technology => "Technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    /// Accepts the stored value or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}
