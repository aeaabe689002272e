//! In-memory backend state: seeded catalogue, users, carts and orders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

/// Shared handle to the backend state.
#[derive(Clone, Default)]
pub struct Shared(Arc<Mutex<BackendState>>);

impl Shared {
    pub fn seeded() -> Self {
        Self(Arc::new(Mutex::new(BackendState::seeded())))
    }

    pub fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
}

impl User {
    pub fn record(&self, message: &str) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "is_staff": self.is_staff,
            "message": message,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i64,
    pub is_available: bool,
}

impl Product {
    pub fn final_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "price": self.price.to_string(),
            "final_price": self.final_price().to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Size {
    pub id: i64,
    pub product_id: i64,
    pub label: String,
    pub stock: i64,
}

impl Size {
    fn summary(&self) -> Value {
        json!({ "id": self.id, "size": self.label, "stock": self.stock })
    }
}

#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: i64,
    pub product_id: i64,
    pub size_id: Option<i64>,
    pub quantity: i64,
}

/// An injected response for the next request to an endpoint.
#[derive(Debug, Clone)]
pub struct Fault {
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Default)]
pub struct BackendState {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    pub sizes: Vec<Size>,
    pub carts: HashMap<String, Vec<CartLine>>,
    pub orders: Vec<Value>,
    pub hits: HashMap<String, usize>,
    pub faults: HashMap<String, Fault>,
    pub delays: HashMap<String, Duration>,
    next_user_id: i64,
    next_line_id: i64,
    next_order_id: i64,
}

impl BackendState {
    /// Two accounts, three products and a few sizes.
    pub fn seeded() -> Self {
        let mut state = Self {
            next_user_id: 1,
            next_line_id: 100,
            next_order_id: 1,
            ..Self::default()
        };

        state.add_user("Admin User", "admin@sneakershelf.com", "admin123", true);
        state.add_user("johndoe", "user@sneakershelf.com", "password123", false);

        state.products = vec![
            Product {
                id: 1,
                name: "Air Max 90".to_string(),
                price: Decimal::new(12999, 2),
                discount_price: None,
                stock: 10,
                is_available: true,
            },
            Product {
                id: 2,
                name: "Jordan 1 Retro High".to_string(),
                price: Decimal::new(19999, 2),
                discount_price: Some(Decimal::new(17999, 2)),
                stock: 4,
                is_available: true,
            },
            Product {
                id: 3,
                name: "Ultraboost 22".to_string(),
                price: Decimal::new(18999, 2),
                discount_price: None,
                stock: 0,
                is_available: true,
            },
        ];
        state.sizes = vec![
            Size {
                id: 9,
                product_id: 1,
                label: "UK 9".to_string(),
                stock: 5,
            },
            Size {
                id: 10,
                product_id: 1,
                label: "UK 10".to_string(),
                stock: 2,
            },
            Size {
                id: 11,
                product_id: 2,
                label: "UK 8".to_string(),
                stock: 4,
            },
        ];

        state
    }

    pub fn add_user(&mut self, username: &str, email: &str, password: &str, is_staff: bool) -> User {
        let user = User {
            id: self.next_user_id,
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            is_staff,
        };
        self.next_user_id += 1;
        self.users.push(user.clone());
        user
    }

    pub fn product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn size(&self, id: i64) -> Option<&Size> {
        self.sizes.iter().find(|s| s.id == id)
    }

    pub fn cart_mut(&mut self, session: &str) -> &mut Vec<CartLine> {
        self.carts.entry(session.to_string()).or_default()
    }

    pub fn next_line_id(&mut self) -> i64 {
        let id = self.next_line_id;
        self.next_line_id += 1;
        id
    }

    /// Stock limit for a line: the size's stock when sized, else the
    /// product's.
    pub fn available(&self, product_id: i64, size_id: Option<i64>) -> i64 {
        size_id
            .and_then(|id| self.size(id))
            .map(|s| s.stock)
            .or_else(|| self.product(product_id).map(|p| p.stock))
            .unwrap_or(0)
    }

    fn line_price(&self, line: &CartLine) -> Decimal {
        self.product(line.product_id)
            .map_or(Decimal::ZERO, Product::final_price)
    }

    fn line_json(&self, line: &CartLine) -> Value {
        let product = self.product(line.product_id).map(Product::summary);
        let size = line.size_id.and_then(|id| self.size(id)).map(Size::summary);
        let subtotal = self.line_price(line) * Decimal::from(line.quantity);
        json!({
            "id": line.id,
            "product": product,
            "product_id": line.product_id,
            "size": size,
            "size_id": line.size_id,
            "quantity": line.quantity,
            "subtotal": subtotal.to_string(),
        })
    }

    /// Cart record in the shape the real backend serializes.
    pub fn cart_json(&self, session: &str) -> Value {
        let lines = self.carts.get(session).map(Vec::as_slice).unwrap_or_default();
        let total_items: i64 = lines.iter().map(|l| l.quantity).sum();
        let total_price: Decimal = lines
            .iter()
            .map(|l| self.line_price(l) * Decimal::from(l.quantity))
            .sum();
        json!({
            "items": lines.iter().map(|l| self.line_json(l)).collect::<Vec<_>>(),
            "total_items": total_items,
            "total_price": total_price.to_string(),
        })
    }

    /// Turn the session's cart into an order and empty the cart.
    pub fn place_order(&mut self, session: &str, details: &Value, shipping_cost: Decimal) -> Value {
        let lines = self.carts.remove(session).unwrap_or_default();
        let subtotal: Decimal = lines
            .iter()
            .map(|l| self.line_price(l) * Decimal::from(l.quantity))
            .sum();

        let id = self.next_order_id;
        self.next_order_id += 1;
        let now = Utc::now();
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let order_number = format!("ORD-{}-{id:04}", now.format("%Y%m%d"));

        let items: Vec<Value> = lines
            .iter()
            .map(|line| {
                let price = self.line_price(line);
                json!({
                    "id": line.id,
                    "product": self.product(line.product_id).map(Product::summary),
                    "size": line.size_id.and_then(|s| self.size(s)).map(Size::summary),
                    "quantity": line.quantity,
                    "price": price.to_string(),
                    "subtotal": (price * Decimal::from(line.quantity)).to_string(),
                })
            })
            .collect();

        let field = |name: &str| details.get(name).and_then(Value::as_str).unwrap_or_default();
        let order = json!({
            "id": id,
            "order_number": order_number,
            "full_name": field("full_name"),
            "email": field("email"),
            "phone": field("phone"),
            "address": field("address"),
            "city": field("city"),
            "postal_code": field("postal_code"),
            "country": field("country"),
            "subtotal": subtotal.to_string(),
            "shipping_cost": shipping_cost.to_string(),
            "total": (subtotal + shipping_cost).to_string(),
            "status": "pending",
            "status_display": "Pending",
            "notes": field("notes"),
            "items": items,
            "created_at": timestamp,
            "updated_at": timestamp,
        });

        self.orders.push(order.clone());
        order
    }

    pub fn order(&self, order_number: &str) -> Option<&Value> {
        self.orders
            .iter()
            .find(|o| o.get("order_number").and_then(Value::as_str) == Some(order_number))
    }
}
