//! Catalog item records as stored in the data store's `products` table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product category.
///
/// Categories are free-form strings owned by the data store; only the
/// try-on flow gives one of them special meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Category of items that can be virtually tried on.
    pub const CLOTHING: &'static str = "clothing";

    /// Create a category from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The clothing category.
    #[must_use]
    pub fn clothing() -> Self {
        Self::new(Self::CLOTHING)
    }

    /// Get the category name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A purchasable product.
///
/// Read-only from this system's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    pub category: Category,
    #[serde(rename = "image_url")]
    pub image_ref: String,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, rename = "reviews_count")]
    pub review_count: i64,
}

impl CatalogItem {
    /// List price in the storefront currency.
    #[must_use]
    pub fn list_price(&self) -> Price {
        Price::from_amount(self.price)
    }

    /// Price the customer sees: the discount price when one is set.
    #[must_use]
    pub fn display_price(&self) -> Price {
        Price::from_amount(self.discount_price.unwrap_or(self.price))
    }

    /// Whether the item belongs to the given category.
    #[must_use]
    pub fn is_in(&self, category: &Category) -> bool {
        &self.category == category
    }

    /// Whether any stock is left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_data_store_row() {
        let row = serde_json::json!({
            "id": "p-1",
            "name": "Linen Shirt",
            "description": "Breathable",
            "price": 1299.5,
            "discount_price": null,
            "category": "clothing",
            "image_url": "https://cdn.example/shirt.jpg",
            "stock_quantity": 4,
            "rating": 4.5,
            "reviews_count": 12
        });

        let item: CatalogItem = serde_json::from_value(row).unwrap();
        assert_eq!(item.id.as_str(), "p-1");
        assert_eq!(item.price, Decimal::new(12995, 1));
        assert!(item.is_in(&Category::clothing()));
        assert_eq!(item.review_count, 12);
        assert!(item.in_stock());
    }

    #[test]
    fn test_display_price_prefers_discount() {
        let row = serde_json::json!({
            "id": "p-2",
            "name": "Scarf",
            "price": 500,
            "discount_price": 350,
            "category": "accessories",
            "image_url": "https://cdn.example/scarf.jpg"
        });

        let item: CatalogItem = serde_json::from_value(row).unwrap();
        assert_eq!(item.display_price().amount, Decimal::new(350, 0));
        assert_eq!(item.list_price().amount, Decimal::new(500, 0));
        assert!(!item.in_stock());
    }
}
