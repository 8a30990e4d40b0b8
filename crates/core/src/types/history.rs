//! Past try-on generations of a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::catalog::CatalogItem;
use super::id::{ProductId, TryOnHistoryId};

/// One generated try-on, as stored in `tryon_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryOnHistoryEntry {
    pub id: TryOnHistoryId,
    pub product_id: ProductId,
    /// The user's photo that was sent to the relay.
    pub original_image_url: Url,
    pub generated_image_url: Url,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "products", skip_serializing_if = "Option::is_none")]
    pub product: Option<CatalogItem>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_with_embedded_product() {
        let json = r#"{
            "id": "h-1",
            "user_id": "u-1",
            "product_id": "p-1",
            "original_image_url": "https://store.test/user-uploads/u-1/a.png",
            "generated_image_url": "https://store.test/tryon-results/tryon_1.png",
            "created_at": "2024-05-01T10:00:00Z",
            "products": {
                "id": "p-1",
                "name": "Linen Shirt",
                "price": 1299,
                "category": "clothing",
                "image_url": "https://cdn.test/p-1.jpg"
            }
        }"#;

        let entry: TryOnHistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id.as_str(), "h-1");
        assert_eq!(entry.product.unwrap().name, "Linen Shirt");
    }

    #[test]
    fn test_product_is_optional() {
        let json = r#"{
            "id": "h-2",
            "product_id": "p-9",
            "original_image_url": "https://store.test/a.png",
            "generated_image_url": "https://store.test/b.png",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;

        let entry: TryOnHistoryEntry = serde_json::from_str(json).unwrap();
        assert!(entry.product.is_none());
    }
}
