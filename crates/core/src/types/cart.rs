//! Cart lines and the locally computed cart summary.
//!
//! Cart contents live in the data store, keyed by the authenticated user. The
//! only computation done locally is the order summary: `Σ price × quantity`
//! plus a fixed shipping charge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::CatalogItem;
use super::id::{CartLineId, ProductId};
use super::price::Price;

/// Flat shipping charge added to every non-empty order, in the storefront currency.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1")]
    Zero,
}

/// A cart or order quantity, always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(1);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] if `value` is zero.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::Zero);
        }
        Ok(Self(value))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

/// A line in a user's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Product embedded by the data store join (`select=*,products(*)`).
    #[serde(default, rename = "products", skip_serializing_if = "Option::is_none")]
    pub product: Option<CatalogItem>,
}

impl CartLine {
    /// Line total at list price. Lines without an embedded product count as zero.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .as_ref()
            .map_or(Decimal::ZERO, |product| {
                product.price * Decimal::from(self.quantity.get())
            })
    }
}

/// Order summary shown on the cart page and used when placing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub item_count: u32,
}

impl CartSummary {
    /// Summarize cart lines with the standard [`SHIPPING_FEE`].
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        Self::with_shipping(lines, SHIPPING_FEE)
    }

    /// Summarize cart lines with an explicit shipping charge.
    #[must_use]
    pub fn with_shipping(lines: &[CartLine], shipping: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(CartLine::line_total).sum();
        let item_count = lines.iter().map(|line| line.quantity.get()).sum();

        Self {
            subtotal: Price::from_amount(subtotal),
            shipping: Price::from_amount(shipping),
            total: Price::from_amount(subtotal + shipping),
            item_count,
        }
    }
}
