//! Storefront client against the fake data store, and the full try-on flow
//! through a real relay.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use fitroom_core::{CartLineId, CartSummary, CatalogItem, OrderStatus, ProductId, Quantity, Rating, UserId};
use fitroom_integration_tests::{PNG, RESULTS_BUCKET, Upstream, spawn_relay};
use fitroom_storefront::config::StorefrontConfig;
use fitroom_storefront::datastore::{DataStoreClient, DataStoreError, ProductQuery, SessionUploads, UserSession};
use fitroom_storefront::tryon::{Phase, RelayClient, TryOnController};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

fn config(upstream: &Upstream, relay_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        data_store_url: upstream.base().clone(),
        anon_key: SecretString::from("anon_Vb7nQ2xK9mT4wL6pR1zJ8c"),
        relay_url,
        uploads_bucket: "user-uploads".to_string(),
    }
}

fn session() -> UserSession {
    UserSession::new(UserId::parse("u-1").unwrap(), "access-token-for-u-1")
}

fn product(id: &str, price: i64, image_url: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": price,
        "category": "clothing",
        "image_url": image_url,
        "stock_quantity": 10
    })
}

fn catalog() -> Vec<Value> {
    let mut shoes = product("s-1", 2499, "https://cdn.test/s-1.jpg");
    shoes["category"] = json!("shoes");
    shoes["name"] = json!("Canvas Sneaker");
    let mut linen = product("p-2", 1299, "https://cdn.test/p-2.jpg");
    linen["name"] = json!("Linen Shirt");

    vec![product("p-1", 100, "https://cdn.test/p-1.jpg"), linen, shoes]
}

fn store(upstream: &Upstream) -> DataStoreClient {
    DataStoreClient::new(&config(upstream, Url::parse("http://localhost:3000").unwrap()))
}

fn qty(n: u32) -> Quantity {
    Quantity::new(n).unwrap()
}

fn pid(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

fn cart_row(id: &str, product: Value, quantity: u32) -> Value {
    json!({
        "id": id,
        "product_id": product["id"],
        "quantity": quantity,
        "products": product
    })
}

#[tokio::test]
async fn test_cart_totals_and_checkout() {
    let upstream = Upstream::start().await;
    upstream.set_cart("u-1", vec![
        cart_row("c-1", product("p-1", 100, "https://cdn.test/p-1.jpg"), 2),
        cart_row("c-2", product("p-2", 50, "https://cdn.test/p-2.jpg"), 1),
    ]);
    let client = DataStoreClient::new(&config(&upstream, Url::parse("http://localhost:3000").unwrap()));

    let lines = client.get_cart(&session()).await.unwrap();
    let summary = CartSummary::from_lines(&lines);
    assert_eq!(summary.subtotal.amount, Decimal::from(250));
    assert_eq!(summary.total.amount, Decimal::from(300));
    assert_eq!(summary.item_count, 3);

    let order = client
        .create_order(&session(), &lines, "cod", "12 Market Road")
        .await
        .unwrap();
    assert_eq!(order.total_amount, Decimal::from(300));
    assert_eq!(order.order_status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);

    assert_eq!(upstream.cart_clears.load(Ordering::SeqCst), 1);
    assert!(client.get_cart(&session()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_to_cart_merges_same_product() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let first = client.add_to_cart(&session(), &pid("p-1"), qty(1)).await.unwrap();
    assert_eq!(first.product.as_ref().unwrap().name, "Product p-1");

    let merged = client.add_to_cart(&session(), &pid("p-1"), qty(3)).await.unwrap();
    assert_eq!(merged.id, first.id);
    assert_eq!(merged.quantity.get(), 3);
    assert_eq!(upstream.rows("cart_items").len(), 1);

    client.add_to_cart(&session(), &pid("p-2"), qty(1)).await.unwrap();
    let lines = client.get_cart(&session()).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(CartSummary::from_lines(&lines).item_count, 4);
}

#[tokio::test]
async fn test_update_and_remove_cart_lines() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let line = client.add_to_cart(&session(), &pid("p-1"), qty(1)).await.unwrap();

    let updated = client
        .update_cart_line(&session(), &line.id, qty(5))
        .await
        .unwrap();
    assert_eq!(updated.quantity.get(), 5);
    assert!(updated.product.is_some());

    client.remove_cart_line(&session(), &line.id).await.unwrap();
    assert!(client.get_cart(&session()).await.unwrap().is_empty());
    assert_eq!(upstream.cart_clears.load(Ordering::SeqCst), 0);

    let err = client.remove_cart_line(&session(), &line.id).await.unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));

    let missing = CartLineId::parse("c-404").unwrap();
    let err = client
        .update_cart_line(&session(), &missing, qty(2))
        .await
        .unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_cart_lines_are_scoped_to_the_user() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);
    let other = UserSession::new(UserId::parse("u-2").unwrap(), "access-token-for-u-2");

    let line = client.add_to_cart(&other, &pid("p-1"), qty(1)).await.unwrap();

    assert!(client.get_cart(&session()).await.unwrap().is_empty());
    let err = client.remove_cart_line(&session(), &line.id).await.unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));
    assert_eq!(client.get_cart(&other).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let first = client.add_to_wishlist(&session(), &pid("p-2")).await.unwrap();
    let again = client.add_to_wishlist(&session(), &pid("p-2")).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(upstream.rows("wishlist").len(), 1);

    let entries = client.get_wishlist(&session()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product.as_ref().unwrap().name, "Linen Shirt");
}

#[tokio::test]
async fn test_wishlist_missing_product_and_entry() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let err = client
        .add_to_wishlist(&session(), &pid("p-404"))
        .await
        .unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));
    assert!(upstream.rows("wishlist").is_empty());

    client.add_to_wishlist(&session(), &pid("p-1")).await.unwrap();
    client.remove_from_wishlist(&session(), &pid("p-1")).await.unwrap();
    assert!(client.get_wishlist(&session()).await.unwrap().is_empty());

    let err = client
        .remove_from_wishlist(&session(), &pid("p-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_catalog_reads_are_cached() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let page = client.list_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(page.len(), 3);
    client.list_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 1);

    // Listed items are cached individually too
    let item = client.get_product(&pid("p-2")).await.unwrap();
    assert_eq!(item.name, "Linen Shirt");
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 1);

    let err = client.get_product(&pid("p-404")).await.unwrap_err();
    assert!(matches!(err, DataStoreError::NotFound(_)));
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 2);

    let garments = client.tryon_catalog().await.unwrap();
    assert_eq!(garments.len(), 2);
    assert!(garments.iter().all(|item| item.category.as_str() == "clothing"));

    client.invalidate_catalog();
    client.list_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_search_is_case_insensitive_and_cached() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    let found = client.search_products("LINEN").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "p-2");

    let again = client.search_products(" linen ").await.unwrap();
    assert_eq!(again, found);
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 1);

    assert!(client.search_products("100%").await.unwrap().is_empty());
    assert!(client.search_products("**").await.unwrap().is_empty());
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_review_refreshes_cached_product() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);

    assert!(Rating::new(0).is_err());
    assert!(Rating::new(6).is_err());

    assert_eq!(client.get_product(&pid("p-1")).await.unwrap().review_count, 0);
    assert_eq!(client.get_product(&pid("p-1")).await.unwrap().review_count, 0);
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 1);

    let review = client
        .post_review(&session(), &pid("p-1"), Rating::new(5).unwrap(), "  Great fit ")
        .await
        .unwrap();
    assert_eq!(review.comment, "Great fit");
    assert_eq!(review.rating.stars(), 5);

    let product = client.get_product(&pid("p-1")).await.unwrap();
    assert_eq!(product.review_count, 1);
    assert_eq!(upstream.product_reads.load(Ordering::SeqCst), 2);

    let reviews = client.list_reviews(&pid("p-1")).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert!(client.list_reviews(&pid("p-2")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tryon_flow_end_to_end() {
    let upstream = Upstream::start().await;
    let relay_url = spawn_relay(&upstream).await;
    let config = config(&upstream, relay_url);

    let garment_row = product("g-1", 1499, &upstream.image_url("garment.png"));
    upstream.set_products(vec![garment_row.clone()]);

    let store = DataStoreClient::new(&config);
    let uploads = Arc::new(SessionUploads::new(store.clone(), session()));
    let controller = TryOnController::new(Arc::new(RelayClient::new(&config).unwrap()), uploads.clone())
        .with_history(uploads);

    let garment: CatalogItem = serde_json::from_value(garment_row).unwrap();
    controller.set_catalog(vec![garment]).await;
    controller
        .select_photo("me.png", "image/png", PNG.to_vec())
        .await
        .unwrap();
    controller
        .select_item(&ProductId::parse("g-1").unwrap())
        .await
        .unwrap();

    let phase = controller.submit().await.unwrap();

    let Phase::Succeeded(outcome) = phase else {
        panic!("expected success, got {phase:?}");
    };
    assert!(outcome.result_url.path().contains("/tryon_"));
    assert_eq!(outcome.item.name, "Product g-1");

    let uploads = upstream.object_names("user-uploads");
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].starts_with("u-1/"));
    assert_eq!(upstream.object_names(RESULTS_BUCKET).len(), 1);

    let history = store.list_tryon_history(&session()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].product_id.as_str(), "g-1");
    assert_eq!(history[0].generated_image_url, outcome.result_url);
    assert!(history[0].original_image_url.path().contains("/user-uploads/u-1/"));
    assert_eq!(history[0].product.as_ref().unwrap().name, "Product g-1");
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let upstream = Upstream::start().await;
    upstream.set_products(catalog());
    let client = store(&upstream);
    let original = Url::parse("https://store.test/user-uploads/u-1/me.png").unwrap();

    for (product_id, result) in [("p-1", "tryon_1.png"), ("p-2", "tryon_2.png")] {
        let generated = Url::parse(&format!("https://store.test/tryon-results/{result}")).unwrap();
        client
            .record_tryon(&session(), &pid(product_id), &original, &generated)
            .await
            .unwrap();
    }

    let history = client.list_tryon_history(&session()).await.unwrap();
    let products: Vec<&str> = history.iter().map(|e| e.product_id.as_str()).collect();
    assert_eq!(products, vec!["p-2", "p-1"]);

    let other = UserSession::new(UserId::parse("u-2").unwrap(), "access-token-for-u-2");
    assert!(client.list_tryon_history(&other).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tryon_flow_reports_busy_provider() {
    let upstream = Upstream::start().await;
    upstream.set_busy(true);
    let relay_url = spawn_relay(&upstream).await;
    let config = config(&upstream, relay_url);

    let store = DataStoreClient::new(&config);
    let controller = TryOnController::new(
        Arc::new(RelayClient::new(&config).unwrap()),
        Arc::new(SessionUploads::new(store, session())),
    );

    let garment: CatalogItem =
        serde_json::from_value(product("g-1", 1499, &upstream.image_url("garment.png"))).unwrap();
    controller.set_catalog(vec![garment]).await;
    controller
        .select_photo("me.png", "image/png", PNG.to_vec())
        .await
        .unwrap();
    controller
        .select_item(&ProductId::parse("g-1").unwrap())
        .await
        .unwrap();

    let phase = controller.submit().await.unwrap();

    let Phase::Failed(message) = phase else {
        panic!("expected failure, got {phase:?}");
    };
    assert!(message.contains("Queue is full"));
    assert_eq!(controller.snapshot().await.progress().percent(), 0);
}
