//! Cart snapshot types and parsing.

use std::num::NonZeroU32;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sneakershelf_core::{CartItemId, Price, ProductId, SizeId};
use thiserror::Error;
use tracing::warn;

/// Reasons a server cart record is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("cart snapshot must be an object")]
    NotAnObject,

    #[error("cart snapshot has no items array")]
    MissingItems,

    #[error("cart item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned line ID.
    pub item_id: CartItemId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_id: Option<SizeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    pub quantity: NonZeroU32,
    pub unit_price: Price,
}

impl CartItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity.get()
    }
}

/// The cart as last reported by the server.
///
/// Totals are derived from `items` on every read and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn get(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.item_id == item_id)
    }

    #[must_use]
    pub fn contains(&self, item_id: &CartItemId) -> bool {
        self.get(item_id).is_some()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items
            .iter()
            .fold(Price::zero(), |acc, item| acc + item.line_total())
    }

    /// Parse a server cart record.
    ///
    /// The record is `{ items: [...], total_items?, total_price? }`. Item
    /// fields accept either flat IDs (`product_id`, `size_id`) or expanded
    /// objects (`product`, `size`). The unit price comes from `unit_price`,
    /// `price`, `product.final_price`, `product.price` or
    /// `subtotal / quantity`, whichever is present first.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if the record or any line is malformed. No
    /// partial cart is ever produced.
    pub fn from_snapshot(record: &Value) -> Result<Self, SnapshotError> {
        let object = record.as_object().ok_or(SnapshotError::NotAnObject)?;
        let raw_items = object
            .get("items")
            .and_then(Value::as_array)
            .ok_or(SnapshotError::MissingItems)?;

        let mut items = Vec::with_capacity(raw_items.len());
        let mut subtotal = Price::zero();
        for (index, raw) in raw_items.iter().enumerate() {
            let invalid = |reason: &str| SnapshotError::InvalidItem {
                index,
                reason: reason.to_string(),
            };
            let item = parse_item(raw).map_err(|reason| invalid(&reason))?;
            // Totals are derived on every read, so they must fit up front.
            let line_total = item
                .unit_price
                .checked_mul(item.quantity.get())
                .ok_or_else(|| invalid("line total overflows"))?;
            subtotal = subtotal
                .checked_add(line_total)
                .ok_or_else(|| invalid("cart subtotal overflows"))?;
            items.push(item);
        }

        let cart = Self { items };

        if let Some(reported) = object.get("total_items").and_then(Value::as_u64)
            && reported != cart.total_quantity()
        {
            warn!(
                reported,
                derived = cart.total_quantity(),
                "Server total_items disagrees with cart lines"
            );
        }

        Ok(cart)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_item(raw: &Value) -> Result<CartItem, String> {
    let item = raw.as_object().ok_or("item must be an object")?;

    let item_id = item
        .get("id")
        .or_else(|| item.get("item_id"))
        .and_then(id_string)
        .map(CartItemId::new)
        .ok_or("missing id")?;

    let product = item.get("product").and_then(Value::as_object);
    let product_id = item
        .get("product_id")
        .and_then(id_string)
        .or_else(|| product.and_then(|p| p.get("id")).and_then(id_string))
        .or_else(|| item.get("product").and_then(id_string))
        .map(ProductId::new)
        .ok_or("missing product")?;
    let product_name = product
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let size = item.get("size").and_then(Value::as_object);
    let size_id = item
        .get("size_id")
        .and_then(id_string)
        .or_else(|| size.and_then(|s| s.get("id")).and_then(id_string))
        .or_else(|| item.get("size").and_then(id_string))
        .map(SizeId::new);
    let size_label = size
        .and_then(|s| s.get("size").or_else(|| s.get("label")))
        .and_then(label_string);

    let quantity = item
        .get("quantity")
        .and_then(|q| match q {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .and_then(|q| u32::try_from(q).ok())
        .and_then(NonZeroU32::new)
        .ok_or("quantity must be a positive integer")?;

    let unit_price = unit_price(item, product, quantity).ok_or("missing price")?;

    Ok(CartItem {
        item_id,
        product_id,
        product_name,
        size_id,
        size_label,
        quantity,
        unit_price: Price::usd(unit_price),
    })
}

fn unit_price(
    item: &Map<String, Value>,
    product: Option<&Map<String, Value>>,
    quantity: NonZeroU32,
) -> Option<Decimal> {
    item.get("unit_price")
        .or_else(|| item.get("price"))
        .and_then(decimal)
        .or_else(|| {
            product.and_then(|p| p.get("final_price").or_else(|| p.get("price")).and_then(decimal))
        })
        .or_else(|| {
            item.get("subtotal")
                .and_then(decimal)
                .map(|subtotal| subtotal / Decimal::from(quantity.get()))
        })
}

/// IDs arrive as numbers or strings depending on the serializer.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        _ => None,
    }
}

fn label_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// DRF renders decimals as strings; accept numbers too.
fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}
