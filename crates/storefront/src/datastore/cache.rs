//! Cache types for catalog reads.

use fitroom_core::{CatalogItem, ProductId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products {
        category: Option<String>,
        limit: u32,
        offset: u32,
    },
    Search(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<CatalogItem>),
    Products(Vec<CatalogItem>),
}
