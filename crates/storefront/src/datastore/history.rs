//! Try-on history (`tryon_history`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitroom_core::{ProductId, TryOnHistoryEntry, TryOnHistoryId, UserId};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::orders::new_id;
use super::{DataStoreClient, DataStoreError, RETURN_REPRESENTATION, SessionUploads, UserSession, eq};
use crate::tryon::TryOnHistory;

#[derive(Serialize)]
struct HistoryRow<'a> {
    id: &'a TryOnHistoryId,
    user_id: &'a UserId,
    product_id: &'a ProductId,
    original_image_url: &'a str,
    generated_image_url: &'a str,
    created_at: DateTime<Utc>,
}

impl DataStoreClient {
    /// Record a generated try-on for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, original, generated), fields(user_id = %session.user_id, product_id = %product_id))]
    pub async fn record_tryon(
        &self,
        session: &UserSession,
        product_id: &ProductId,
        original: &Url,
        generated: &Url,
    ) -> Result<TryOnHistoryEntry, DataStoreError> {
        let entry_id: TryOnHistoryId = new_id()?;
        let url = self.table_url("tryon_history", &[])?;
        let request = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&HistoryRow {
                id: &entry_id,
                user_id: &session.user_id,
                product_id,
                original_image_url: original.as_str(),
                generated_image_url: generated.as_str(),
                created_at: Utc::now(),
            });

        let entry = self
            .fetch_one(request, || format!("Created try-on history entry {entry_id}"))
            .await?;
        debug!(entry_id = %entry_id, "Try-on recorded");
        Ok(entry)
    }

    /// The user's try-ons, newest first, with products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn list_tryon_history(&self, session: &UserSession) -> Result<Vec<TryOnHistoryEntry>, DataStoreError> {
        let url = self.table_url(
            "tryon_history",
            &[
                ("select", "*,products(*)".to_string()),
                ("user_id", eq(&session.user_id)),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        self.execute(self.request(Method::GET, url, Some(session)))
            .await
    }
}

#[async_trait]
impl TryOnHistory for SessionUploads {
    async fn record(&self, product_id: &ProductId, original: &Url, generated: &Url) -> Result<(), DataStoreError> {
        self.client()
            .record_tryon(self.session(), product_id, original, generated)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_history_row_shape() {
        let id = TryOnHistoryId::parse("h-1").unwrap();
        let user = UserId::parse("u-1").unwrap();
        let product = ProductId::parse("p-1").unwrap();
        let row = HistoryRow {
            id: &id,
            user_id: &user,
            product_id: &product,
            original_image_url: "https://store.test/a.png",
            generated_image_url: "https://store.test/b.png",
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["product_id"], "p-1");
        assert_eq!(json["generated_image_url"], "https://store.test/b.png");
    }
}
