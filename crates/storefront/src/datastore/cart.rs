//! Cart (`cart_items`) and wishlist (`wishlist`) operations.
//!
//! Every call is scoped to the session's user id.

use fitroom_core::{CartLine, CartLineId, ProductId, Quantity, UserId, WishlistEntry};
use reqwest::Method;
use serde::Serialize;
use tracing::{info, instrument};

use super::{DataStoreClient, DataStoreError, RETURN_REPRESENTATION, UserSession, eq};

/// Embeds the product row on cart and wishlist reads.
const WITH_PRODUCT: &str = "*,products(*)";

#[derive(Serialize)]
struct CartLineRow<'a> {
    user_id: &'a UserId,
    product_id: &'a ProductId,
    quantity: Quantity,
}

#[derive(Serialize)]
struct QuantityPatch {
    quantity: Quantity,
}

#[derive(Serialize)]
struct WishlistRow<'a> {
    user_id: &'a UserId,
    product_id: &'a ProductId,
}

impl DataStoreClient {
    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the user's cart lines with their products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn get_cart(&self, session: &UserSession) -> Result<Vec<CartLine>, DataStoreError> {
        let url = self.table_url(
            "cart_items",
            &[
                ("select", WITH_PRODUCT.to_string()),
                ("user_id", eq(&session.user_id)),
            ],
        )?;
        self.execute(self.request(Method::GET, url, Some(session)))
            .await
    }

    /// Add a product to the cart, merging with an existing line for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        session: &UserSession,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, DataStoreError> {
        let url = self.table_url(
            "cart_items",
            &[
                ("on_conflict", "user_id,product_id".to_string()),
                ("select", WITH_PRODUCT.to_string()),
            ],
        )?;
        let row = CartLineRow {
            user_id: &session.user_id,
            product_id,
            quantity,
        };

        let request = self
            .request(Method::POST, url, Some(session))
            .header(
                "Prefer",
                format!("{RETURN_REPRESENTATION},resolution=merge-duplicates"),
            )
            .json(&row);

        self.fetch_one(request, || format!("Cart line for product {product_id}"))
            .await
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the line does not belong to the user, or an error
    /// if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, line_id = %line_id))]
    pub async fn update_cart_line(
        &self,
        session: &UserSession,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, DataStoreError> {
        let url = self.table_url(
            "cart_items",
            &[
                ("id", eq(line_id)),
                ("user_id", eq(&session.user_id)),
                ("select", WITH_PRODUCT.to_string()),
            ],
        )?;

        let request = self
            .request(Method::PATCH, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&QuantityPatch { quantity });

        self.fetch_one(request, || format!("Cart line not found: {line_id}"))
            .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the line does not belong to the user, or an error
    /// if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, line_id = %line_id))]
    pub async fn remove_cart_line(
        &self,
        session: &UserSession,
        line_id: &CartLineId,
    ) -> Result<(), DataStoreError> {
        let url = self.table_url(
            "cart_items",
            &[("id", eq(line_id)), ("user_id", eq(&session.user_id))],
        )?;

        let request = self
            .request(Method::DELETE, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION);

        let _removed: CartLine = self
            .fetch_one(request, || format!("Cart line not found: {line_id}"))
            .await?;
        Ok(())
    }

    /// Remove every line from the user's cart.
    pub(super) async fn clear_cart(&self, session: &UserSession) -> Result<(), DataStoreError> {
        let url = self.table_url("cart_items", &[("user_id", eq(&session.user_id))])?;
        self.execute_empty(self.request(Method::DELETE, url, Some(session)))
            .await
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Get the user's wishlist with products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn get_wishlist(&self, session: &UserSession) -> Result<Vec<WishlistEntry>, DataStoreError> {
        let url = self.table_url(
            "wishlist",
            &[
                ("select", WITH_PRODUCT.to_string()),
                ("user_id", eq(&session.user_id)),
            ],
        )?;
        self.execute(self.request(Method::GET, url, Some(session)))
            .await
    }

    /// Add a product to the wishlist. Adding an already listed product
    /// returns the existing entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist, or an error if the API
    /// request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, product_id = %product_id))]
    pub async fn add_to_wishlist(
        &self,
        session: &UserSession,
        product_id: &ProductId,
    ) -> Result<WishlistEntry, DataStoreError> {
        self.get_product(product_id).await?;

        if let Some(existing) = self.find_wishlist_entry(session, product_id).await? {
            info!("Product already in wishlist");
            return Ok(existing);
        }

        let url = self.table_url("wishlist", &[("select", WITH_PRODUCT.to_string())])?;
        let request = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&WishlistRow {
                user_id: &session.user_id,
                product_id,
            });

        self.fetch_one(request, || format!("Wishlist entry for {product_id}"))
            .await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product is not in the wishlist, or an error
    /// if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, product_id = %product_id))]
    pub async fn remove_from_wishlist(
        &self,
        session: &UserSession,
        product_id: &ProductId,
    ) -> Result<(), DataStoreError> {
        if self.find_wishlist_entry(session, product_id).await?.is_none() {
            return Err(DataStoreError::NotFound(format!(
                "Not in wishlist: {product_id}"
            )));
        }

        let url = self.table_url(
            "wishlist",
            &[
                ("user_id", eq(&session.user_id)),
                ("product_id", eq(product_id)),
            ],
        )?;
        self.execute_empty(self.request(Method::DELETE, url, Some(session)))
            .await
    }

    async fn find_wishlist_entry(
        &self,
        session: &UserSession,
        product_id: &ProductId,
    ) -> Result<Option<WishlistEntry>, DataStoreError> {
        let url = self.table_url(
            "wishlist",
            &[
                ("select", WITH_PRODUCT.to_string()),
                ("user_id", eq(&session.user_id)),
                ("product_id", eq(product_id)),
            ],
        )?;
        let entries: Vec<WishlistEntry> = self
            .execute(self.request(Method::GET, url, Some(session)))
            .await?;
        Ok(entries.into_iter().next())
    }
}
