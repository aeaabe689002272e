//! Cart store with server reconciliation.
//!
//! The local cart is never edited speculatively. Each mutation is one
//! gateway call; on success the returned snapshot replaces the cart
//! wholesale, on failure the cart is left exactly as it was and the error
//! is returned.
//!
//! # Ordering
//!
//! With [`CartOrdering::Serialized`] (the default) mutations run one at a
//! time in call order. With [`CartOrdering::LastResponseWins`] they run
//! concurrently and whichever response arrives last defines the cart.

mod types;

pub use types::{Cart, CartItem, SnapshotError};

use std::sync::Arc;

use serde_json::{Value, json};
use sneakershelf_core::{CartItemId, ProductId, SizeId};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, instrument};

use crate::config::CartOrdering;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::gateway::Gateway;

/// Owner of the local cart.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    gateway: Gateway,
    state: watch::Sender<Cart>,
    ordering: CartOrdering,
    in_flight: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("ordering", &self.inner.ordering)
            .field("lines", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create an empty cart backed by `gateway`.
    #[must_use]
    pub fn new(gateway: Gateway, ordering: CartOrdering) -> Self {
        let (state, _) = watch::channel(Cart::default());
        Self {
            inner: Arc::new(CartInner {
                gateway,
                state,
                ordering,
                in_flight: Mutex::new(()),
            }),
        }
    }

    /// Clone of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.state.borrow().clone()
    }

    /// Sum of line quantities in the current cart.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.inner.state.borrow().total_quantity()
    }

    /// Sum of line totals in the current cart.
    #[must_use]
    pub fn subtotal(&self) -> sneakershelf_core::Price {
        self.inner.state.borrow().subtotal()
    }

    /// Observe cart replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.state.subscribe()
    }

    /// Add `quantity` of a product (and size) to the cart.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for `quantity < 1` without calling the backend;
    /// otherwise any gateway or snapshot error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        size_id: Option<&SizeId>,
        quantity: i64,
    ) -> Result<Cart> {
        if quantity < 1 {
            return Err(ClientError::invalid_field(
                "quantity",
                "Quantity must be at least 1",
            ));
        }

        let _turn = self.turn().await;
        let body = json!({
            "product_id": wire_id(product_id.as_str()),
            "size_id": size_id.map(|s| wire_id(s.as_str())),
            "quantity": quantity,
        });
        let record = self.inner.gateway.post("/cart/add_item/", &body).await?;
        let cart = self.replace(&record)?;

        add_breadcrumb(
            "cart",
            "Item added",
            Some(&[("product_id", product_id.as_str())]),
        );
        Ok(cart)
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns any gateway or snapshot error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_item(&self, item_id: &CartItemId, quantity: i64) -> Result<Cart> {
        if quantity <= 0 {
            return self.remove_item(item_id).await;
        }

        let _turn = self.turn().await;
        let body = json!({
            "item_id": wire_id(item_id.as_str()),
            "quantity": quantity,
        });
        let record = self.inner.gateway.post("/cart/update_item/", &body).await?;
        let cart = self.replace(&record)?;

        add_breadcrumb("cart", "Item updated", Some(&[("item_id", item_id.as_str())]));
        Ok(cart)
    }

    /// Remove a line. Lines the client does not hold are ignored.
    ///
    /// # Errors
    ///
    /// Returns any gateway or snapshot error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: &CartItemId) -> Result<Cart> {
        let _turn = self.turn().await;

        if !self.inner.state.borrow().contains(item_id) {
            debug!("Item not in cart, nothing to remove");
            return Ok(self.snapshot());
        }

        let body = json!({ "item_id": wire_id(item_id.as_str()) });
        let record = self.inner.gateway.post("/cart/remove_item/", &body).await?;
        let cart = self.replace(&record)?;

        add_breadcrumb("cart", "Item removed", Some(&[("item_id", item_id.as_str())]));
        Ok(cart)
    }

    /// Empty the cart on the backend.
    ///
    /// # Errors
    ///
    /// Returns any gateway or snapshot error.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart> {
        let _turn = self.turn().await;
        let record = self.inner.gateway.post_empty("/cart/clear/").await?;
        let cart = self.replace(&record)?;

        add_breadcrumb("cart", "Cart cleared", None);
        Ok(cart)
    }

    /// Re-read the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns any gateway or snapshot error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart> {
        let _turn = self.turn().await;
        let record = self.inner.gateway.get("/cart/").await?;
        self.replace(&record)
    }

    /// Drop the local cart without telling the backend.
    pub fn discard(&self) {
        self.inner.state.send_if_modified(|cart| {
            if cart.is_empty() {
                false
            } else {
                *cart = Cart::default();
                true
            }
        });
        debug!("Local cart discarded");
    }

    async fn turn(&self) -> Option<MutexGuard<'_, ()>> {
        match self.inner.ordering {
            CartOrdering::Serialized => Some(self.inner.in_flight.lock().await),
            CartOrdering::LastResponseWins => None,
        }
    }

    fn replace(&self, record: &Value) -> Result<Cart> {
        let cart = Cart::from_snapshot(record)?;
        self.inner.state.send_replace(cart.clone());
        debug!(
            lines = cart.len(),
            total_quantity = cart.total_quantity(),
            "Cart replaced from snapshot"
        );
        Ok(cart)
    }
}

/// Numeric IDs go over the wire as numbers, anything else as a string.
fn wire_id(id: &str) -> Value {
    id.parse::<i64>().map_or_else(|_| Value::from(id), Value::from)
}
