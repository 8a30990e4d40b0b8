//! Catalog inspection.
//!
//! # Environment Variables
//!
//! - `DATA_STORE_URL` - Base URL of the hosted data store
//! - `DATA_STORE_ANON_KEY` - Public API key

use fitroom_core::Category;
use fitroom_storefront::config::StorefrontConfig;
use fitroom_storefront::datastore::{DataStoreClient, ProductQuery};
use tracing::info;

/// List catalog items, optionally filtered by category or a name search.
///
/// # Errors
///
/// Returns an error if configuration is missing or the request fails.
pub async fn list(
    category: Option<String>,
    search: Option<&str>,
    limit: u32,
    offset: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let client = DataStoreClient::new(&config);

    let items = match search {
        Some(term) => client.search_products(term).await?,
        None => {
            let query = ProductQuery {
                limit,
                offset,
                category: category.map(Category::new),
            };
            client.list_products(&query).await?
        }
    };

    info!(count = items.len(), "Catalog items");
    for item in &items {
        info!(
            id = %item.id,
            category = %item.category,
            price = %item.display_price().display(),
            stock = item.stock_quantity,
            "{}",
            item.name
        );
    }
    Ok(())
}
