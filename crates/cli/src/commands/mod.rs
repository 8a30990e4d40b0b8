//! Subcommand implementations.

pub mod cart;
pub mod generate;
pub mod history;
pub mod products;
pub mod stylist;

use fitroom_core::UserId;
use fitroom_storefront::datastore::UserSession;
use secrecy::SecretString;
use thiserror::Error;

/// Errors raised before a command reaches the network.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// A URL argument or variable could not be parsed.
    #[error("Invalid URL for {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

/// Session for `user_id` with the token from `FITROOM_ACCESS_TOKEN`.
fn session_from_env(user_id: &str) -> Result<UserSession, Box<dyn std::error::Error>> {
    let access_token = std::env::var("FITROOM_ACCESS_TOKEN")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("FITROOM_ACCESS_TOKEN"))?;
    Ok(UserSession {
        user_id: UserId::parse(user_id)?,
        access_token,
    })
}
