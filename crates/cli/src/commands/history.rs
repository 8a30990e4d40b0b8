//! Try-on history for one user.
//!
//! # Environment Variables
//!
//! - `DATA_STORE_URL` - Base URL of the hosted data store
//! - `DATA_STORE_ANON_KEY` - Public API key
//! - `FITROOM_ACCESS_TOKEN` - The user's access token

use fitroom_storefront::config::StorefrontConfig;
use fitroom_storefront::datastore::DataStoreClient;
use tracing::info;

use super::session_from_env;

/// List a user's try-ons, newest first.
///
/// # Errors
///
/// Returns an error if configuration or the token is missing, or the request fails.
pub async fn show(user_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let session = session_from_env(user_id)?;

    let client = DataStoreClient::new(&config);
    let entries = client.list_tryon_history(&session).await?;

    info!(count = entries.len(), "Try-on history");
    for entry in &entries {
        let name = entry.product.as_ref().map_or("(unknown product)", |p| p.name.as_str());
        info!(
            created_at = %entry.created_at,
            product_id = %entry.product_id,
            generated = %entry.generated_image_url,
            "{name}"
        );
    }
    Ok(())
}
