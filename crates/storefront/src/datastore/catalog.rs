//! Catalog reads (`products` table), cached for 5 minutes.

use fitroom_core::{CatalogItem, Category, ProductId};
use reqwest::Method;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{DataStoreClient, DataStoreError, eq};

/// Page size when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 12;
/// Largest page the client will request.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Number of items fetched for the try-on garment picker.
pub const TRYON_CATALOG_LIMIT: u32 = 50;

/// Paging and filtering for [`DataStoreClient::list_products`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub limit: u32,
    pub offset: u32,
    pub category: Option<Category>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            category: None,
        }
    }
}

impl ProductQuery {
    /// First page of one category.
    #[must_use]
    pub fn category(category: Category, limit: u32) -> Self {
        Self {
            limit,
            offset: 0,
            category: Some(category),
        }
    }

    /// Limit clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

impl DataStoreClient {
    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List a page of products, optionally within one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(limit = query.limit, offset = query.offset))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<CatalogItem>, DataStoreError> {
        let limit = query.effective_limit();
        let cache_key = CacheKey::Products {
            category: query.category.as_ref().map(|c| c.as_str().to_string()),
            limit,
            offset: query.offset,
        };

        if let Some(CacheValue::Products(items)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(items);
        }

        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", eq(category)));
        }

        let url = self.table_url("products", &params)?;
        let items: Vec<CatalogItem> = self.execute(self.request(Method::GET, url, None)).await?;

        self.cache_items(&items).await;
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(items.clone()))
            .await;

        Ok(items)
    }

    /// Get one product by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no product has this id, or an error if the API
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<CatalogItem, DataStoreError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(item)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*item);
        }

        let url = self.table_url("products", &[("select", "*".to_string()), ("id", eq(id))])?;
        let item: CatalogItem = self
            .fetch_one(self.request(Method::GET, url, None), || {
                format!("Product not found: {id}")
            })
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(item.clone())))
            .await;

        Ok(item)
    }

    /// Products whose name contains `query`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Vec<CatalogItem>, DataStoreError> {
        let Some(needle) = search_needle(query) else {
            return Ok(Vec::new());
        };

        let cache_key = CacheKey::Search(needle.to_lowercase());
        if let Some(CacheValue::Products(items)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for search");
            return Ok(items);
        }

        let url = self.table_url(
            "products",
            &[
                ("select", "*".to_string()),
                ("name", format!("ilike.*{needle}*")),
                ("limit", MAX_PAGE_SIZE.to_string()),
            ],
        )?;
        let items: Vec<CatalogItem> = self.execute(self.request(Method::GET, url, None)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(items.clone()))
            .await;

        Ok(items)
    }

    /// First `limit` products of one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn products_by_category(
        &self,
        category: &Category,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, DataStoreError> {
        self.list_products(&ProductQuery::category(category.clone(), limit))
            .await
    }

    /// Garments offered by the try-on picker.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn tryon_catalog(&self) -> Result<Vec<CatalogItem>, DataStoreError> {
        self.products_by_category(&Category::clothing(), TRYON_CATALOG_LIMIT)
            .await
    }

    async fn cache_items(&self, items: &[CatalogItem]) {
        for item in items {
            self.inner
                .cache
                .insert(
                    CacheKey::Product(item.id.clone()),
                    CacheValue::Product(Box::new(item.clone())),
                )
                .await;
        }
    }
}

/// Literal `ilike` substring for a user query, or `None` if nothing is left.
///
/// `*` is the `PostgREST` wildcard and `,()` delimit filter lists, so they are
/// dropped; `%`, `_` and backslashes are escaped so they match literally.
fn search_needle(query: &str) -> Option<String> {
    let mut needle = String::with_capacity(query.len());
    for c in query.trim().chars() {
        match c {
            '*' | ',' | '(' | ')' => {}
            '%' | '_' | '\\' => {
                needle.push('\\');
                needle.push(c);
            }
            _ => needle.push(c),
        }
    }

    let needle = needle.trim();
    (!needle.is_empty()).then(|| needle.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_needle_strips_wildcards() {
        assert_eq!(search_needle("  linen shirt "), Some("linen shirt".to_string()));
        assert_eq!(search_needle("tee*(x)"), Some("teex".to_string()));
        assert_eq!(search_needle("***"), None);
        assert_eq!(search_needle(" , ( ) "), None);
        assert_eq!(search_needle("   "), None);
    }

    #[test]
    fn test_search_needle_escapes_like_wildcards() {
        assert_eq!(search_needle("100%"), Some("100\\%".to_string()));
        assert_eq!(search_needle("a_b"), Some("a\\_b".to_string()));
    }

    #[tokio::test]
    async fn test_empty_needle_makes_no_request() {
        // Unroutable base: any request would fail
        let client = super::super::tests::client("http://127.0.0.1:9");
        assert!(client.search_products("***").await.unwrap().is_empty());
    }

    #[test]
    fn test_limit_is_clamped() {
        let query = ProductQuery {
            limit: 500,
            ..ProductQuery::default()
        };
        assert_eq!(query.effective_limit(), MAX_PAGE_SIZE);

        let query = ProductQuery {
            limit: 0,
            ..ProductQuery::default()
        };
        assert_eq!(query.effective_limit(), 1);
    }

    #[test]
    fn test_default_query() {
        let query = ProductQuery::default();
        assert_eq!(query.limit, 12);
        assert_eq!(query.offset, 0);
        assert!(query.category.is_none());
    }
}
