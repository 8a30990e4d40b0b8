//! Core types for Fitroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod history;
pub mod id;
pub mod image;
pub mod order;
pub mod price;
pub mod status;
pub mod stylist;
pub mod tryon;

pub use cart::{CartLine, CartSummary, Quantity, QuantityError, SHIPPING_FEE};
pub use catalog::{CatalogItem, Category};
pub use history::TryOnHistoryEntry;
pub use id::*;
pub use image::{LocalImage, MAX_PHOTO_BYTES, PhotoRejected, extension_for_mime};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, Rating, RatingError, Review, WishlistEntry};
pub use price::{CurrencyCode, Price};
pub use status::OrderStatus;
pub use stylist::{Occasion, SkinTone, StyleRule, style_rule, style_suggestions};
pub use tryon::{
    ErrorBody, GenerateTryOnBody, TryOnRequest, TryOnRequestError, TryOnResult, TryOnSuccess,
};
