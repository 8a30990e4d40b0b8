//! Run one try-on through the relay.
//!
//! # Usage
//!
//! ```bash
//! fitroom generate --person https://cdn.example/me.jpg --garment https://cdn.example/shirt.jpg
//!
//! # Against a relay that is not on localhost:3000
//! fitroom generate -p ... -g ... --relay https://relay.example
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_URL` - Relay base URL when `--relay` is not given

use fitroom_core::{GenerateTryOnBody, TryOnRequest};
use fitroom_storefront::config::DEFAULT_RELAY_URL;
use fitroom_storefront::tryon::{RelayClient, TryOnRelay};
use tracing::{error, info};
use url::Url;

use super::CommandError;

/// Send `person` and `garment` to the relay and print the result URL.
///
/// # Errors
///
/// Returns an error if the URLs are invalid or the relay call fails.
pub async fn run(person: &str, garment: &str, relay: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let relay_url = match relay {
        Some(url) => url.to_owned(),
        None => std::env::var("RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.to_owned()),
    };
    let relay_url = Url::parse(&relay_url).map_err(|e| CommandError::InvalidUrl {
        name: "relay",
        reason: e.to_string(),
    })?;

    let request = TryOnRequest::from_body(&GenerateTryOnBody {
        person_url: Some(person.to_owned()),
        garment_url: Some(garment.to_owned()),
    })?;

    let client = RelayClient::with_base(&relay_url)?;
    info!(endpoint = %client.endpoint(), "Requesting try-on");

    match client.generate(&request).await {
        Ok(success) => {
            info!(url = %success.url, "Try-on complete");
            Ok(())
        }
        Err(e) => {
            error!(message = %e.user_message(), "Try-on failed");
            Err(e.into())
        }
    }
}
