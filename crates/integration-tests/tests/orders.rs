//! Integration tests for checkout and order tracking.

use std::str::FromStr;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;
use sneakershelf_client::forms::CheckoutDraft;
use sneakershelf_client::{ClientError, Storefront};
use sneakershelf_core::{OrderStatus, ProductId, SizeId};
use sneakershelf_integration_tests::MockBackend;

fn draft() -> CheckoutDraft {
    CheckoutDraft {
        full_name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "USA".to_string(),
        ..CheckoutDraft::default()
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("Invalid decimal")
}

async fn fill_cart(storefront: &Storefront) {
    storefront
        .cart()
        .add_item(&ProductId::new("1"), Some(&SizeId::new("9")), 2)
        .await
        .expect("Add failed");
    storefront
        .cart()
        .add_item(&ProductId::new("2"), Some(&SizeId::new("11")), 1)
        .await
        .expect("Add failed");
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;

    let order = storefront.checkout(&draft()).await.expect("Checkout failed");

    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.subtotal, dec("439.97"));
    assert_eq!(order.shipping_cost, dec("10.00"));
    assert_eq!(order.total, dec("449.97"));
    assert_eq!(order.status, OrderStatus::Pending);

    assert!(storefront.cart().snapshot().is_empty());
    assert_eq!(backend.cart_line_count(), 0);
}

#[tokio::test]
async fn test_checkout_uses_given_shipping_cost() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;

    let order = storefront
        .checkout(&CheckoutDraft {
            shipping_cost: Some(Decimal::ZERO),
            notes: "Leave at the door".to_string(),
            ..draft()
        })
        .await
        .expect("Checkout failed");

    assert_eq!(order.total, order.subtotal);
    assert_eq!(order.notes, "Leave at the door");
}

#[tokio::test]
async fn test_empty_cart_is_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let err = storefront
        .checkout(&draft())
        .await
        .expect_err("Empty cart should be rejected");

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(backend.request_count("/orders/create_order/"), 0);
}

#[tokio::test]
async fn test_missing_shipping_fields_are_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;

    let err = storefront
        .checkout(&CheckoutDraft {
            city: String::new(),
            ..draft()
        })
        .await
        .expect_err("Missing city should be rejected");

    assert!(err.field_errors().get("city").is_some());
    assert_eq!(backend.request_count("/orders/create_order/"), 0);
    assert_eq!(storefront.cart().snapshot().len(), 2);
}

#[tokio::test]
async fn test_failed_cart_clear_still_returns_order() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;

    backend.fail_next(
        "/cart/clear/",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": "boom" }),
    );
    let order = storefront.checkout(&draft()).await.expect("Checkout failed");

    assert_eq!(order.items.len(), 2);
    assert!(storefront.cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_backend_rejection_keeps_cart() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;

    backend.fail_next(
        "/orders/create_order/",
        StatusCode::BAD_REQUEST,
        json!({ "phone": ["Enter a valid phone number."] }),
    );
    let err = storefront
        .checkout(&draft())
        .await
        .expect_err("Injected rejection should surface");

    assert_eq!(
        err.field_errors().get("phone"),
        Some("Enter a valid phone number.")
    );
    assert_eq!(storefront.cart().snapshot().len(), 2);
}

// =============================================================================
// Tracking
// =============================================================================

#[tokio::test]
async fn test_track_placed_order() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();
    fill_cart(&storefront).await;
    let order = storefront.checkout(&draft()).await.expect("Checkout failed");

    // Tracking needs no session.
    let tracking = backend
        .storefront()
        .track_order(&format!("  {}  ", order.order_number))
        .await
        .expect("Tracking failed");

    assert_eq!(tracking.order_number, order.order_number);
    assert_eq!(tracking.status, OrderStatus::Pending);
    assert_eq!(tracking.status_display, "Pending");
    assert_eq!(tracking.items_count, 2);
    assert_eq!(tracking.total, order.total);
}

#[tokio::test]
async fn test_track_unknown_order_is_not_found() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let err = storefront
        .track_order("ORD-19700101-9999")
        .await
        .expect_err("Unknown order should fail");

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(
        err.field_errors().get("non_field_errors"),
        Some("Order not found")
    );
}

#[tokio::test]
async fn test_blank_order_number_is_rejected_locally() {
    let backend = MockBackend::spawn().await;
    let storefront = backend.storefront();

    let err = storefront
        .track_order("   ")
        .await
        .expect_err("Blank number should be rejected");

    assert_eq!(
        err.field_errors().get("order_number"),
        Some("Order number is required")
    );
}
