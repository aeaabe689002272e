//! The storefront facade shared by every front end.
//!
//! Wires the gateway, session store, cart store and order service together
//! and implements the flows that span more than one of them: bootstrapping
//! from disk, login, signup, logout and guarded navigation.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::forms::{CheckoutDraft, LoginDraft, SignupDraft};
use crate::gateway::Gateway;
use crate::guard::{self, Navigator, View};
use crate::orders::{Order, OrderTracking, Orders};
use crate::session::persist::{PersistedSession, SessionFile};
use crate::session::{Identity, Session, SessionStore};

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub identity: Identity,
    /// Where the user should land next.
    pub destination: View,
}

/// Result of a successful signup. The backend does not start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub identity: Identity,
    pub message: Option<String>,
    pub destination: View,
}

/// Storefront client state.
///
/// Cheaply cloneable via `Arc`; clones share the same session and cart.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    gateway: Gateway,
    session: SessionStore,
    cart: CartStore,
    orders: Orders,
    session_file: Option<SessionFile>,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("gateway", &self.inner.gateway)
            .field("session", &self.inner.session)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a storefront with an anonymous session and an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let gateway = Gateway::new(&config)?;
        let session = SessionStore::new();
        let cart = CartStore::new(gateway.clone(), config.cart_ordering);
        let orders = Orders::new(gateway.clone(), cart.clone());
        let session_file = config.session_file.clone().map(SessionFile::new);

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                gateway,
                session,
                cart,
                orders,
                session_file,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &Orders {
        &self.inner.orders
    }

    /// Restore the persisted session (if any), then load the cart.
    ///
    /// The session is hydrated even when the cart refresh fails; the
    /// refresh error is still returned.
    ///
    /// # Errors
    ///
    /// Returns any gateway or snapshot error from the cart refresh.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<Session> {
        let persisted = match &self.inner.session_file {
            Some(file) => file.load().await,
            None => None,
        };

        let record = match persisted {
            Some(PersistedSession {
                identity, cookies, ..
            }) => {
                if let Some(cookies) = cookies {
                    self.inner.gateway.restore_cookies(&cookies);
                }
                identity.and_then(|identity| serde_json::to_value(identity).ok())
            }
            None => None,
        };

        let session = self.inner.session.hydrate(record);
        self.inner.cart.refresh().await?;

        debug!(
            role = %session.role(),
            cart_lines = self.inner.cart.snapshot().len(),
            "Storefront bootstrapped"
        );
        Ok(session)
    }

    /// Log in through `entry` (the shopper or the admin login view).
    ///
    /// The role comes from the backend's identity record, never from the
    /// entry view. Admin entry lands on the dashboard only when the guard
    /// lets the new session in.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without a backend call if the draft is invalid,
    /// `Gateway` if the backend rejects the credentials (the session is left
    /// as it was), or `MalformedResponse` for an unusable identity record.
    #[instrument(skip(self, draft), fields(entry = %entry, email = %draft.email.trim()))]
    pub async fn login(&self, entry: View, draft: &LoginDraft) -> Result<LoginOutcome> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }

        let record = self
            .inner
            .gateway
            .post("/login/", &draft.to_request())
            .await?;
        let identity = Identity::from_server(&record)?;

        let session = self.inner.session.authenticate(identity.clone());
        let role = identity.role().to_string();
        add_breadcrumb("auth", "Logged in", Some(&[("role", role.as_str())]));

        if let Err(e) = self.inner.cart.refresh().await {
            warn!(error = %e, "Cart refresh after login failed");
        }
        if let Err(e) = self.save_session().await {
            warn!(error = %e, "Failed to persist session after login");
        }

        let destination = if entry == View::AdminLogin
            && guard::can_enter(View::AdminDashboard, &session)
        {
            View::AdminDashboard
        } else {
            View::Home
        };

        info!(user_id = %identity.id(), destination = %destination, "Login complete");
        Ok(LoginOutcome {
            identity,
            destination,
        })
    }

    /// Register a new account. The user still has to log in afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without a backend call if the draft is invalid,
    /// `Gateway` with the backend's per-field errors if registration is
    /// refused, or `MalformedResponse` for an unusable record.
    #[instrument(skip(self, draft), fields(email = %draft.email.trim()))]
    pub async fn signup(&self, draft: &SignupDraft) -> Result<Registered> {
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(ClientError::Validation(errors));
        }

        let record = self
            .inner
            .gateway
            .post("/signup/", &draft.to_request())
            .await?;
        let identity = Identity::from_server(&record)?;
        let message = record
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        info!(user_id = %identity.id(), "Account registered");
        Ok(Registered {
            identity,
            message,
            destination: View::Login,
        })
    }

    /// End the session and forget the persisted state.
    ///
    /// The backend cart is cleared while the old session is still live,
    /// then the backend session cookies are dropped so the next request
    /// starts an anonymous session. A failed clear only empties the local
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the session file exists but cannot be
    /// removed; the in-memory session is already anonymous by then.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let was_authenticated = self.inner.session.is_authenticated();
        if was_authenticated {
            if let Err(e) = self.inner.cart.clear().await {
                warn!(error = %e, "Cart clear on logout failed");
            }
            self.inner.gateway.forget_session();
        }
        self.inner.session.logout();
        self.inner.cart.discard();

        if let Some(file) = &self.inner.session_file {
            file.clear().await?;
        }

        if was_authenticated {
            add_breadcrumb("auth", "Logged out", None);
        }
        Ok(())
    }

    /// Write the current identity and backend cookies to the session file.
    ///
    /// Does nothing when no session file is configured.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the file cannot be written.
    pub async fn save_session(&self) -> Result<()> {
        let Some(file) = &self.inner.session_file else {
            return Ok(());
        };

        let persisted = PersistedSession::new(
            self.inner.session.current().identity().cloned(),
            self.inner.gateway.session_cookies(),
        );
        file.save(&persisted).await?;
        Ok(())
    }

    /// Navigate to `view` through the route guard.
    ///
    /// Returns the view actually shown.
    pub fn navigate<N: Navigator + ?Sized>(&self, view: View, navigator: &mut N) -> View {
        guard::enter(view, &self.inner.session.current(), navigator)
    }

    /// Place an order for the current cart.
    ///
    /// # Errors
    ///
    /// See [`Orders::checkout`].
    pub async fn checkout(&self, draft: &CheckoutDraft) -> Result<Order> {
        self.inner.orders.checkout(draft).await
    }

    /// Look up an order by number.
    ///
    /// # Errors
    ///
    /// See [`Orders::track_order`].
    pub async fn track_order(&self, order_number: &str) -> Result<OrderTracking> {
        self.inner.orders.track_order(order_number).await
    }
}
