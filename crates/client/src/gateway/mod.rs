//! Request gateway: the single chokepoint for backend calls.
//!
//! # Behavior
//!
//! - Resolves relative endpoints beneath the configured API root
//! - Sends and accepts JSON, forwarding the session cookie jar
//! - One round trip per call: no retries, no caching
//! - Parses the body as JSON whatever the status, and hands error bodies
//!   back verbatim in [`GatewayError::Http`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sneakershelf_client::gateway::Gateway;
//!
//! let gateway = Gateway::new(&config)?;
//! let cart = gateway.get("/cart/").await?;
//! let cart = gateway
//!     .post("/cart/add_item/", &json!({"product_id": 1, "size_id": 9, "quantity": 1}))
//!     .await?;
//! ```

mod error;

pub use error::GatewayError;

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the HTTP connection pool and cookie jar.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cookies", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway for the configured API root.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Setup` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let cookies = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&cookies));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(GatewayError::Setup)?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: directory_url(&config.api_base_url),
                cookies,
            }),
        })
    }

    /// The API root every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve a relative endpoint to an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidEndpoint` for absolute URLs or paths
    /// that cannot be joined to the API root.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, GatewayError> {
        resolve_endpoint(&self.inner.base_url, endpoint)
    }

    /// Perform one request against the backend.
    ///
    /// # Errors
    ///
    /// - `Transport` if no response was received
    /// - `Http` if the server answered with a non-success status
    /// - `Decode` if a success response body is not JSON
    /// - `InvalidEndpoint` if the endpoint cannot be resolved
    #[instrument(skip(self, body), fields(method = %method, endpoint = %endpoint))]
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let url = self.resolve(endpoint)?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(GatewayError::Encode)?;
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Backend unreachable");
            GatewayError::Transport(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(GatewayError::Transport)?;
        let parsed = parse_body(&text);

        if status.is_success() {
            debug!(status = %status, "Backend call succeeded");
            return parsed.map_err(|source| GatewayError::Decode { status, source });
        }

        warn!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        let payload = parsed.unwrap_or(Value::String(text));
        Err(GatewayError::Http { status, payload })
    }

    /// `GET` an endpoint.
    ///
    /// # Errors
    ///
    /// See [`Gateway::call`].
    pub async fn get(&self, endpoint: &str) -> Result<Value, GatewayError> {
        self.call(endpoint, Method::GET, None).await
    }

    /// `POST` a serializable body to an endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the body cannot be serialized; otherwise see
    /// [`Gateway::call`].
    pub async fn post<B>(&self, endpoint: &str, body: &B) -> Result<Value, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body).map_err(GatewayError::Encode)?;
        self.call(endpoint, Method::POST, Some(&body)).await
    }

    /// `POST` to an endpoint without a body.
    ///
    /// # Errors
    ///
    /// See [`Gateway::call`].
    pub async fn post_empty(&self, endpoint: &str) -> Result<Value, GatewayError> {
        self.call(endpoint, Method::POST, None).await
    }

    /// The `Cookie` header value the gateway would send to the API root.
    ///
    /// Used to persist the backend session across process restarts.
    #[must_use]
    pub fn session_cookies(&self) -> Option<String> {
        self.inner
            .cookies
            .cookies(&self.inner.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .filter(|s| !s.is_empty())
    }

    /// Seed the cookie jar from a header produced by [`Gateway::session_cookies`].
    pub fn restore_cookies(&self, header: &str) {
        let root = self.origin_root();
        for pair in header.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.inner
                .cookies
                .add_cookie_str(&format!("{pair}; Path=/"), &root);
        }
    }

    /// Expire every cookie the gateway would send, ending the backend session.
    pub fn forget_session(&self) {
        let Some(header) = self.session_cookies() else {
            return;
        };
        let root = self.origin_root();
        for (name, _) in header.split(';').filter_map(|pair| pair.trim().split_once('=')) {
            self.inner
                .cookies
                .add_cookie_str(&format!("{name}=; Max-Age=0; Path=/"), &root);
        }
    }

    fn origin_root(&self) -> Url {
        let mut root = self.inner.base_url.clone();
        root.set_path("/");
        root.set_query(None);
        root
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Ensure the API root ends with `/` so joins stay beneath it.
fn directory_url(base: &Url) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn resolve_endpoint(base: &Url, endpoint: &str) -> Result<Url, GatewayError> {
    let invalid = |reason: &str| GatewayError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    if Url::parse(endpoint).is_ok() {
        return Err(invalid("absolute URLs are not allowed"));
    }

    let (path, query) = match endpoint.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (endpoint, None),
    };

    let path = path.trim_start_matches('/');
    let mut url = if path.is_empty() {
        base.clone()
    } else if path.ends_with('/') {
        base.join(path).map_err(|e| invalid(&e.to_string()))?
    } else {
        base.join(&format!("{path}/"))
            .map_err(|e| invalid(&e.to_string()))?
    };

    if !url.as_str().starts_with(base.as_str()) {
        return Err(invalid("path escapes the API root"));
    }

    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}

fn parse_body(text: &str) -> Result<Value, serde_json::Error> {
    if text.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(text)
    }
}
