//! Checkout and order tracking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sneakershelf_core::{OrderId, OrderStatus, ProductId, SizeId};
use tracing::{info, instrument, warn};

use crate::cart::CartStore;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::forms::CheckoutDraft;
use crate::gateway::Gateway;

/// Product summary embedded in an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
}

/// Size embedded in an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSize {
    pub id: SizeId,
    #[serde(default)]
    pub size: Option<String>,
}

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderId,
    #[serde(default)]
    pub product: Option<OrderProduct>,
    #[serde(default)]
    pub size: Option<OrderSize>,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
}

/// An order as returned by `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_display: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status summary returned by the tracking endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TrackingRecord")]
pub struct OrderTracking {
    pub order_number: String,
    pub status: OrderStatus,
    pub status_display: String,
    pub total: Decimal,
    pub items_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The backend answers tracking requests with either the short tracking
/// shape (`items_count`) or the full order (`items`).
#[derive(Deserialize)]
struct TrackingRecord {
    order_number: String,
    status: OrderStatus,
    #[serde(default)]
    status_display: Option<String>,
    total: Decimal,
    #[serde(default)]
    items_count: Option<usize>,
    #[serde(default)]
    items: Option<Vec<Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TrackingRecord> for OrderTracking {
    fn from(record: TrackingRecord) -> Self {
        let status_display = record
            .status_display
            .unwrap_or_else(|| title_case(record.status.as_str()));
        Self {
            items_count: record
                .items_count
                .or_else(|| record.items.as_ref().map(Vec::len))
                .unwrap_or_default(),
            order_number: record.order_number,
            status: record.status,
            status_display,
            total: record.total,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Checkout and tracking against the orders resource.
#[derive(Debug, Clone)]
pub struct Orders {
    gateway: Gateway,
    cart: CartStore,
}

impl Orders {
    #[must_use]
    pub const fn new(gateway: Gateway, cart: CartStore) -> Self {
        Self { gateway, cart }
    }

    /// Place an order for the current cart.
    ///
    /// On success the cart is cleared on the backend and locally. A failure
    /// to clear is logged and does not fail the checkout.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the draft or cart is rejected locally, or any
    /// gateway or decode error.
    #[instrument(skip(self, draft))]
    pub async fn checkout(&self, draft: &CheckoutDraft) -> Result<Order> {
        let errors = draft.validate(&self.cart.snapshot());
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }

        let record = self
            .gateway
            .post("/orders/create_order/", draft)
            .await?;
        let order: Order =
            serde_json::from_value(record).map_err(|e| ClientError::MalformedResponse {
                what: "order record",
                source: Box::new(e),
            })?;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            lines = order.items.len(),
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.order_number.as_str())]),
        );

        if let Err(e) = self.cart.clear().await {
            warn!(error = %e, "Order placed but clearing the cart failed");
            self.cart.discard();
        }

        Ok(order)
    }

    /// Look up an order's status by its order number.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank number, or any gateway or decode
    /// error (`Http` 404 for unknown orders).
    #[instrument(skip(self))]
    pub async fn track_order(&self, order_number: &str) -> Result<OrderTracking> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(ClientError::invalid_field(
                "order_number",
                "Order number is required",
            ));
        }

        let endpoint = format!("/orders/{}/track/", urlencoding::encode(order_number));
        let record = self.gateway.get(&endpoint).await?;
        serde_json::from_value(record).map_err(|e| ClientError::MalformedResponse {
            what: "order tracking record",
            source: Box::new(e),
        })
    }
}
