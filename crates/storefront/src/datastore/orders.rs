//! Orders (`orders`, `order_items`) and reviews (`reviews`).

use chrono::{DateTime, Utc};
use fitroom_core::{
    CartLine, IdError, NewOrder, NewOrderItem, Order, OrderId, OrderStatus, ProductId, Rating, Review,
    ReviewId, UserId,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{DataStoreClient, DataStoreError, RETURN_REPRESENTATION, UserSession, eq};

/// Embeds items and their products on order reads.
const WITH_ITEMS: &str = "*,order_items(*,products(*))";

#[derive(Serialize)]
struct OrderRow<'a> {
    id: &'a OrderId,
    user_id: &'a UserId,
    total_amount: Decimal,
    payment_method: &'a str,
    shipping_address: &'a str,
    order_status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct OrderItemRow<'a> {
    order_id: &'a OrderId,
    #[serde(flatten)]
    item: &'a NewOrderItem,
}

#[derive(Serialize)]
struct StatusPatch {
    order_status: OrderStatus,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ReviewRow<'a> {
    id: &'a ReviewId,
    user_id: &'a UserId,
    product_id: &'a ProductId,
    rating: Rating,
    comment: &'a str,
    created_at: DateTime<Utc>,
}

pub(super) fn new_id<T: std::str::FromStr<Err = IdError>>() -> Result<T, DataStoreError> {
    Ok(Uuid::new_v4().to_string().parse()?)
}

impl DataStoreClient {
    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Place an order for the given cart lines and empty the cart.
    ///
    /// The order total is the cart subtotal at list price plus shipping.
    /// Lines without an embedded product are skipped.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` if no line is priced, or an error if any API
    /// request fails.
    #[instrument(skip(self, session, lines, shipping_address), fields(user_id = %session.user_id, lines = lines.len()))]
    pub async fn create_order(
        &self,
        session: &UserSession,
        lines: &[CartLine],
        payment_method: &str,
        shipping_address: &str,
    ) -> Result<Order, DataStoreError> {
        let new_order = NewOrder::from_cart(lines, payment_method, shipping_address);
        if new_order.is_empty() {
            return Err(DataStoreError::EmptyCart);
        }

        let order_id: OrderId = new_id()?;
        let url = self.table_url("orders", &[])?;
        let request = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&OrderRow {
                id: &order_id,
                user_id: &session.user_id,
                total_amount: new_order.total_amount,
                payment_method: &new_order.payment_method,
                shipping_address: &new_order.shipping_address,
                order_status: OrderStatus::Pending,
                created_at: Utc::now(),
            });
        let mut order: Order = self
            .fetch_one(request, || format!("Created order {order_id}"))
            .await?;

        let items: Vec<OrderItemRow<'_>> = new_order
            .items
            .iter()
            .map(|item| OrderItemRow {
                order_id: &order_id,
                item,
            })
            .collect();
        let url = self.table_url("order_items", &[])?;
        order.items = self
            .execute(
                self.request(Method::POST, url, Some(session))
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&items),
            )
            .await?;

        self.clear_cart(session).await?;

        info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(order)
    }

    /// The user's orders, newest first, with items and products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn list_orders(&self, session: &UserSession) -> Result<Vec<Order>, DataStoreError> {
        let url = self.table_url(
            "orders",
            &[
                ("select", WITH_ITEMS.to_string()),
                ("user_id", eq(&session.user_id)),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        self.execute(self.request(Method::GET, url, Some(session)))
            .await
    }

    /// One of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist for this user, or an
    /// error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, order_id = %order_id))]
    pub async fn get_order(&self, session: &UserSession, order_id: &OrderId) -> Result<Order, DataStoreError> {
        let url = self.table_url(
            "orders",
            &[
                ("select", WITH_ITEMS.to_string()),
                ("id", eq(order_id)),
                ("user_id", eq(&session.user_id)),
            ],
        )?;
        self.fetch_one(self.request(Method::GET, url, Some(session)), || {
            format!("Order not found: {order_id}")
        })
        .await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist for this user, or an
    /// error if the API request fails.
    #[instrument(skip(self, session), fields(user_id = %session.user_id, order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        session: &UserSession,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, DataStoreError> {
        let url = self.table_url(
            "orders",
            &[("id", eq(order_id)), ("user_id", eq(&session.user_id))],
        )?;
        let request = self
            .request(Method::PATCH, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&StatusPatch {
                order_status: status,
                updated_at: Utc::now(),
            });

        self.fetch_one(request, || format!("Order not found: {order_id}"))
            .await
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// Post a review. The rating is range-checked by [`Rating`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session, comment), fields(user_id = %session.user_id, product_id = %product_id))]
    pub async fn post_review(
        &self,
        session: &UserSession,
        product_id: &ProductId,
        rating: Rating,
        comment: &str,
    ) -> Result<Review, DataStoreError> {
        let review_id: ReviewId = new_id()?;
        let url = self.table_url("reviews", &[])?;
        let request = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&ReviewRow {
                id: &review_id,
                user_id: &session.user_id,
                product_id,
                rating,
                comment: comment.trim(),
                created_at: Utc::now(),
            });

        let review = self
            .fetch_one(request, || format!("Created review {review_id}"))
            .await?;

        // Ratings and review counts on the product row change
        self.inner
            .cache
            .invalidate(&super::cache::CacheKey::Product(product_id.clone()))
            .await;

        Ok(review)
    }

    /// Reviews of one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, DataStoreError> {
        let url = self.table_url(
            "reviews",
            &[
                ("select", "*".to_string()),
                ("product_id", eq(product_id)),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        self.execute(self.request(Method::GET, url, None)).await
    }
}
