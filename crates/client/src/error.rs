//! Client error taxonomy and Sentry context helpers.
//!
//! Operations on the stores and the [`Storefront`](crate::Storefront) return
//! `Result<T, ClientError>`. Use [`ClientError::field_errors`] to render any
//! failure next to the form that caused it.

use thiserror::Error;

use crate::cart::SnapshotError;
use crate::forms::{FieldErrors, NON_FIELD_ERRORS};
use crate::gateway::GatewayError;
use crate::session::{Identity, IdentityError};
use crate::session::persist::PersistError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend call failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Local validation rejected the input; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The backend answered with a body the client cannot interpret.
    #[error("Malformed {what}: {source}")]
    MalformedResponse {
        what: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The session file could not be written or removed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistError),
}

impl ClientError {
    /// A validation error for a single field.
    #[must_use]
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        Self::Validation(errors)
    }

    /// Field errors to show the user, from local validation or from the
    /// backend's error payload. Other failures become a single
    /// non-field message.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::Gateway(GatewayError::Http { payload, .. }) => {
                let errors = FieldErrors::from_payload(payload);
                if errors.is_empty() {
                    self.fallback_errors()
                } else {
                    errors
                }
            }
            _ => self.fallback_errors(),
        }
    }

    /// HTTP status of the failed call, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::Gateway(e) => e.status(),
            _ => None,
        }
    }

    fn fallback_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.insert(NON_FIELD_ERRORS, self.to_string());
        errors
    }
}

impl From<SnapshotError> for ClientError {
    fn from(e: SnapshotError) -> Self {
        Self::MalformedResponse {
            what: "cart snapshot",
            source: Box::new(e),
        }
    }
}

impl From<IdentityError> for ClientError {
    fn from(e: IdentityError) -> Self {
        Self::MalformedResponse {
            what: "identity record",
            source: Box::new(e),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Point the Sentry scope at `identity`, or clear it for an anonymous
/// session.
pub fn sync_sentry_user(identity: Option<&Identity>) {
    let user = identity.map(|identity| sentry::User {
        id: Some(identity.id().to_string()),
        email: Some(identity.email().to_string()),
        username: Some(identity.display_name().to_owned()),
        ..Default::default()
    });
    sentry::configure_scope(|scope| scope.set_user(user));
}

/// Record a user action as a Sentry breadcrumb.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Item added", Some(&[("product_id", "1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        ..Default::default()
    };
    breadcrumb.data.extend(
        data.unwrap_or_default()
            .iter()
            .map(|(key, value)| ((*key).to_owned(), serde_json::Value::from(*value))),
    );
    sentry::add_breadcrumb(breadcrumb);
}
