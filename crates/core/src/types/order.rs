//! Orders, wishlist entries and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::{CartLine, CartSummary, Quantity};
use super::catalog::CatalogItem;
use super::id::{OrderId, ProductId, ReviewId, WishlistEntryId};
use super::status::OrderStatus;

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub total_amount: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_address: String,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "order_items")]
    pub items: Vec<OrderItem>,
}

/// A line of a placed order, priced at the time of purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Decimal,
    #[serde(default, rename = "products", skip_serializing_if = "Option::is_none")]
    pub product: Option<CatalogItem>,
}

/// An order about to be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub items: Vec<NewOrderItem>,
    pub payment_method: String,
    pub shipping_address: String,
    pub total_amount: Decimal,
}

/// A line of an order about to be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub price: Decimal,
}

impl NewOrder {
    /// Build an order from cart lines. Lines without an embedded product are
    /// skipped since they have no price to charge.
    ///
    /// The total is the cart summary total, shipping included.
    #[must_use]
    pub fn from_cart(
        lines: &[CartLine],
        payment_method: impl Into<String>,
        shipping_address: impl Into<String>,
    ) -> Self {
        let priced: Vec<CartLine> = lines
            .iter()
            .filter(|line| line.product.is_some())
            .cloned()
            .collect();

        let items = priced
            .iter()
            .filter_map(|line| {
                line.product.as_ref().map(|product| NewOrderItem {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    price: product.price,
                })
            })
            .collect();

        Self {
            items,
            payment_method: payment_method.into(),
            shipping_address: shipping_address.into(),
            total_amount: CartSummary::from_lines(&priced).total.amount,
        }
    }

    /// Whether the order has nothing to charge for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A product saved to a user's wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: WishlistEntryId,
    pub product_id: ProductId,
    #[serde(default, rename = "products", skip_serializing_if = "Option::is_none")]
    pub product: Option<CatalogItem>,
}

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// Rating outside the 1..=5 star range.
    #[error("rating must be between {min} and {max} (got {value})")]
    OutOfRange {
        /// The rejected value.
        value: u8,
        /// Lowest allowed rating.
        min: u8,
        /// Highest allowed rating.
        max: u8,
    },
}

/// A star rating between 1 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] outside `1..=5`.
    pub const fn new(value: u8) -> Result<Self, RatingError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    /// Get the number of stars.
    #[must_use]
    pub const fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::catalog::Category;
    use crate::types::id::CartLineId;

    fn cart_line(id: &str, price: Option<i64>, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::parse(id).unwrap(),
            product_id: ProductId::parse(&format!("p-{id}")).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
            product: price.map(|price| CatalogItem {
                id: ProductId::parse(&format!("p-{id}")).unwrap(),
                name: id.to_string(),
                description: String::new(),
                price: Decimal::from(price),
                discount_price: None,
                category: Category::clothing(),
                image_ref: String::new(),
                stock_quantity: 1,
                rating: 0.0,
                review_count: 0,
            }),
        }
    }

    #[test]
    fn test_new_order_from_cart_includes_shipping() {
        let lines = vec![cart_line("a", Some(100), 2), cart_line("b", Some(50), 1)];
        let order = NewOrder::from_cart(&lines, "cod", "221B Baker Street");

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_amount, Decimal::from(300));
        assert_eq!(order.items[0].price, Decimal::from(100));
    }

    #[test]
    fn test_new_order_skips_unpriced_lines() {
        let lines = vec![cart_line("a", None, 2)];
        let order = NewOrder::from_cart(&lines, "card", "somewhere");
        assert!(order.is_empty());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).unwrap().stars(), 5);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn test_order_deserializes_with_items() {
        let row = serde_json::json!({
            "id": "o-1",
            "total_amount": 300,
            "payment_method": "cod",
            "shipping_address": "home",
            "order_status": "pending",
            "created_at": "2026-01-02T03:04:05Z",
            "order_items": [
                { "product_id": "p-a", "quantity": 2, "price": 100 }
            ]
        });

        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert!(order.items[0].product.is_none());
    }
}
