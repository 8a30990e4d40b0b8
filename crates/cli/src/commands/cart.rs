//! Cart inspection for one user.
//!
//! # Environment Variables
//!
//! - `DATA_STORE_URL` - Base URL of the hosted data store
//! - `DATA_STORE_ANON_KEY` - Public API key
//! - `FITROOM_ACCESS_TOKEN` - The user's access token

use fitroom_core::CartSummary;
use fitroom_storefront::config::StorefrontConfig;
use fitroom_storefront::datastore::DataStoreClient;
use tracing::info;

use super::session_from_env;

/// Show a user's cart lines and the subtotal, shipping and total.
///
/// # Errors
///
/// Returns an error if configuration or the token is missing, or the request fails.
pub async fn show(user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let session = session_from_env(user_id)?;

    let client = DataStoreClient::new(&config);
    let lines = client.get_cart(&session).await?;

    for line in &lines {
        let name = line.product.as_ref().map_or("(unknown product)", |p| p.name.as_str());
        info!(
            product_id = %line.product_id,
            quantity = line.quantity.get(),
            line_total = %line.line_total(),
            "{name}"
        );
    }

    let summary = CartSummary::from_lines(&lines);
    info!(
        items = summary.item_count,
        subtotal = %summary.subtotal.display(),
        shipping = %summary.shipping.display(),
        total = %summary.total.display(),
        "Cart summary"
    );
    Ok(())
}
