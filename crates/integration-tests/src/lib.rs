//! Test support for the Sneakershelf storefront client.
//!
//! [`MockBackend`] serves the storefront REST API from memory on a random
//! local port. Tests point a [`Storefront`] at it and can inject failures
//! or slow responses for individual endpoints.
//!
//! Seeded accounts:
//!
//! - `admin@sneakershelf.com` / `admin123` (staff)
//! - `user@sneakershelf.com` / `password123`
//!
//! Seeded catalogue: product `1` (sizes `9`, `10`), product `2` (size `11`,
//! discounted) and product `3` (out of stock).

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use serde_json::Value;
use sneakershelf_client::{ClientConfig, Storefront};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod state;

use state::{Fault, Shared};

/// In-memory storefront backend bound to `127.0.0.1`.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend with the seeded data.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let state = Shared::seeded();
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener
            .local_addr()
            .expect("Mock backend has no local address");

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// API root, e.g. `http://127.0.0.1:54321/api`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the API root is rejected, which would be a bug here.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.api_url()).expect("Mock backend URL is valid")
    }

    /// A fresh storefront using [`MockBackend::config`].
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        Storefront::new(self.config()).expect("Failed to build storefront")
    }

    /// Answer the next request to `endpoint` with `status` and `body`
    /// instead of running the handler.
    pub fn fail_next(&self, endpoint: &str, status: StatusCode, body: Value) {
        self.state
            .lock()
            .faults
            .insert(endpoint.to_string(), Fault { status, body });
    }

    /// Hold back the response to the next request to `endpoint`.
    pub fn delay_next(&self, endpoint: &str, delay: Duration) {
        self.state
            .lock()
            .delays
            .insert(endpoint.to_string(), delay);
    }

    /// Number of handled requests to `endpoint` (e.g. `/cart/add_item/`).
    #[must_use]
    pub fn request_count(&self, endpoint: &str) -> usize {
        self.state.lock().hits.get(endpoint).copied().unwrap_or_default()
    }

    /// Sum of line quantities over every session's cart.
    #[must_use]
    pub fn total_items_in_carts(&self) -> i64 {
        self.state
            .lock()
            .carts
            .values()
            .flatten()
            .map(|line| line.quantity)
            .sum()
    }

    /// Lines held by the backend across all carts.
    #[must_use]
    pub fn cart_line_count(&self) -> usize {
        self.state.lock().carts.values().map(Vec::len).sum()
    }

    /// Wait until `endpoint` has been handled `count` times.
    ///
    /// # Panics
    ///
    /// Panics if that does not happen within five seconds.
    pub async fn wait_for_requests(&self, endpoint: &str, count: usize) {
        for _ in 0..500 {
            if self.request_count(endpoint) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timed out waiting for {count} request(s) to {endpoint}");
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/login/", post(handlers::login))
        .route("/api/signup/", post(handlers::signup))
        .route("/api/cart/", get(handlers::cart))
        .route("/api/cart/add_item/", post(handlers::add_item))
        .route("/api/cart/update_item/", post(handlers::update_item))
        .route("/api/cart/remove_item/", post(handlers::remove_item))
        .route("/api/cart/clear/", post(handlers::clear))
        .route("/api/orders/create_order/", post(handlers::create_order))
        .route(
            "/api/orders/{order_number}/track/",
            get(handlers::track_order),
        )
        .layer(from_fn_with_state(state.clone(), handlers::session_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
