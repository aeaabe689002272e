//! Integration tests for cart synchronization with the backend.
//!
//! The local cart must always equal the last snapshot the backend returned,
//! and failed mutations must leave it untouched.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use sneakershelf_client::{CartOrdering, ClientError, Storefront};
use sneakershelf_core::{CartItemId, ProductId, SizeId};
use sneakershelf_integration_tests::MockBackend;

fn product(id: &str) -> ProductId {
    ProductId::new(id)
}

fn size(id: &str) -> SizeId {
    SizeId::new(id)
}

async fn add(storefront: &Storefront, product_id: &str, size_id: &str, quantity: i64) {
    storefront
        .cart()
        .add_item(&product(product_id), Some(&size(size_id)), quantity)
        .await
        .expect("Add failed");
}

fn only_item_id(storefront: &Storefront) -> CartItemId {
    let cart = storefront.cart().snapshot();
    assert_eq!(cart.len(), 1, "expected exactly one cart line");
    cart.items()
        .first()
        .map(|item| item.item_id.clone())
        .expect("Cart is empty")
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_adding_same_product_and_size_merges_lines() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    add(&storefront, "1", "9", 1).await;
    add(&storefront, "1", "9", 1).await;

    let cart = storefront.cart().snapshot();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.total_quantity(), 2);
    assert_eq!(cart.subtotal().to_string(), "$259.98");
}

#[tokio::test]
async fn test_different_sizes_are_separate_lines() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    add(&storefront, "1", "9", 1).await;
    add(&storefront, "1", "10", 1).await;

    let cart = storefront.cart().snapshot();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.total_quantity(), 2);
}

#[tokio::test]
async fn test_add_without_size_is_allowed() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let cart = storefront
        .cart()
        .add_item(&product("1"), None, 3)
        .await
        .expect("Add failed");

    let item = cart.items().first().expect("Cart is empty");
    assert_eq!(item.size_id, None);
    assert_eq!(item.quantity.get(), 3);
}

#[tokio::test]
async fn test_update_sets_quantity() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;
    let item_id = only_item_id(&storefront);

    let cart = storefront
        .cart()
        .update_item(&item_id, 4)
        .await
        .expect("Update failed");

    assert_eq!(cart.total_quantity(), 4);
    assert_eq!(backend.total_items_in_carts(), 4);
}

#[tokio::test]
async fn test_update_to_zero_or_less_removes_line() {
    for quantity in [0, -1] {
        let backend = MockBackend::spawn().await;
        let storefront = backend.storefront();
        add(&storefront, "1", "9", 2).await;
        let item_id = only_item_id(&storefront);

        let cart = storefront
            .cart()
            .update_item(&item_id, quantity)
            .await
            .expect("Update failed");

        assert!(cart.is_empty(), "quantity {quantity} should remove the line");
        assert_eq!(backend.request_count("/cart/update_item/"), 0);
        assert_eq!(backend.request_count("/cart/remove_item/"), 1);
        assert_eq!(backend.cart_line_count(), 0);
    }
}

#[tokio::test]
async fn test_removing_unknown_line_makes_no_request() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;

    let cart = storefront
        .cart()
        .remove_item(&CartItemId::new("9999"))
        .await
        .expect("Remove failed");

    assert_eq!(cart.len(), 1);
    assert_eq!(backend.request_count("/cart/remove_item/"), 0);
}

#[tokio::test]
async fn test_clear_empties_cart() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;
    add(&storefront, "2", "11", 1).await;

    let cart = storefront.cart().clear().await.expect("Clear failed");

    assert!(cart.is_empty());
    assert_eq!(backend.cart_line_count(), 0);
}

#[tokio::test]
async fn test_quantity_below_one_is_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let err = storefront
        .cart()
        .add_item(&product("1"), Some(&size("9")), 0)
        .await
        .expect_err("Zero quantity should be rejected");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(backend.request_count("/cart/add_item/"), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_insufficient_stock_leaves_cart_unchanged() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;
    let before = storefront.cart().snapshot();

    let err = storefront
        .cart()
        .add_item(&product("1"), Some(&size("10")), 5)
        .await
        .expect_err("Stock check should fail");

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(
        err.field_errors().get("non_field_errors"),
        Some("Insufficient stock for selected size")
    );
    assert_eq!(storefront.cart().snapshot(), before);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let err = storefront
        .cart()
        .add_item(&product("404"), None, 1)
        .await
        .expect_err("Unknown product should fail");

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert!(storefront.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_server_error_leaves_cart_unchanged() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;
    let before = storefront.cart().snapshot();

    backend.fail_next(
        "/cart/add_item/",
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "detail": "Try again later" }),
    );
    let err = storefront
        .cart()
        .add_item(&product("2"), Some(&size("11")), 1)
        .await
        .expect_err("Injected failure should surface");

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(storefront.cart().snapshot(), before);
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    add(&storefront, "1", "9", 1).await;
    let before = storefront.cart().snapshot();

    backend.fail_next("/cart/", StatusCode::OK, json!({ "total_items": 3 }));
    let err = storefront
        .cart()
        .refresh()
        .await
        .expect_err("Snapshot without items should be rejected");

    assert!(matches!(err, ClientError::MalformedResponse { .. }));
    assert_eq!(storefront.cart().snapshot(), before);
}

#[tokio::test]
async fn test_subscribers_see_each_snapshot() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    let mut updates = storefront.cart().subscribe();

    add(&storefront, "1", "9", 1).await;

    assert!(updates.has_changed().expect("Cart store dropped"));
    assert_eq!(updates.borrow_and_update().total_quantity(), 1);
}

// =============================================================================
// Concurrent mutations
// =============================================================================

/// Issue two adds where the first response is held back until after the
/// second has been handled.
async fn racing_adds(backend: &MockBackend, storefront: &Storefront) {
    // Both adds must share one backend session.
    storefront.cart().refresh().await.expect("Refresh failed");
    backend.delay_next("/cart/add_item/", Duration::from_millis(300));

    let first_product = product("1");
    let first_size = size("9");
    let first = storefront
        .cart()
        .add_item(&first_product, Some(&first_size), 1);
    let second = async {
        backend.wait_for_requests("/cart/add_item/", 1).await;
        storefront
            .cart()
            .add_item(&product("2"), Some(&size("11")), 1)
            .await
    };

    let (first, second) = tokio::join!(first, second);
    first.expect("First add failed");
    second.expect("Second add failed");
}

#[tokio::test]
async fn test_serialized_mutations_end_with_latest_state() {
    let backend = MockBackend::spawn().await;
    let mut config = backend.config();
    config.cart_ordering = CartOrdering::Serialized;
    let storefront = Storefront::new(config).expect("Failed to build storefront");

    racing_adds(&backend, &storefront).await;

    assert_eq!(storefront.cart().snapshot().len(), 2);
    assert_eq!(backend.cart_line_count(), 2);
}

#[tokio::test]
async fn test_last_response_wins_can_keep_stale_snapshot() {
    let backend = MockBackend::spawn().await;
    let mut config = backend.config();
    config.cart_ordering = CartOrdering::LastResponseWins;
    let storefront = Storefront::new(config).expect("Failed to build storefront");

    racing_adds(&backend, &storefront).await;

    // The delayed first response arrives last and replaces the newer one.
    assert_eq!(storefront.cart().snapshot().len(), 1);
    assert_eq!(backend.cart_line_count(), 2);

    let refreshed = storefront.cart().refresh().await.expect("Refresh failed");
    assert_eq!(refreshed.len(), 2);
}
