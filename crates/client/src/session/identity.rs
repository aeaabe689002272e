//! Authenticated identity as asserted by the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sneakershelf_core::{AccountRole, Email, EmailError, UserId};
use thiserror::Error;

/// Reasons an identity record is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The record is not a JSON object.
    #[error("identity record must be an object")]
    NotAnObject,
    /// The record has no usable `id`.
    #[error("identity record has no id")]
    MissingId,
    /// The record has no `email`.
    #[error("identity record has no email")]
    MissingEmail,
    /// The email is malformed.
    #[error("identity email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),
    /// Display name resolved to nothing.
    #[error("identity display name cannot be empty")]
    EmptyDisplayName,
}

/// Minimal profile of the authenticated user.
///
/// Deserialization goes through [`Identity::from_server`], so a persisted
/// identity is held to the same rules as a fresh login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Identity {
    id: UserId,
    display_name: String,
    email: Email,
    role: AccountRole,
}

impl Identity {
    /// Build an identity, rejecting empty fields.
    ///
    /// # Errors
    ///
    /// Returns `MissingId` for a blank id and `EmptyDisplayName` for a blank
    /// display name.
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        email: Email,
        role: AccountRole,
    ) -> Result<Self, IdentityError> {
        if id.as_str().trim().is_empty() {
            return Err(IdentityError::MissingId);
        }
        let display_name = display_name.into().trim().to_owned();
        if display_name.is_empty() {
            return Err(IdentityError::EmptyDisplayName);
        }

        Ok(Self {
            id,
            display_name,
            email,
            role,
        })
    }

    /// Interpret a login/signup response body.
    ///
    /// The backend sends `{ id, username, email, ... }`. The display name
    /// falls back through `display_name`, `username`, `user_name`, `name`
    /// and finally the email local part. The role is administrator when the
    /// record says so through `role` or a truthy `is_admin`, `is_staff` or
    /// `is_superuser` flag; otherwise shopper.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the record lacks an id or a valid email.
    pub fn from_server(record: &Value) -> Result<Self, IdentityError> {
        let object = record.as_object().ok_or(IdentityError::NotAnObject)?;

        let id = match object.get("id") {
            Some(Value::Number(n)) => UserId::new(n.to_string()),
            Some(Value::String(s)) if !s.trim().is_empty() => UserId::new(s.trim()),
            _ => return Err(IdentityError::MissingId),
        };

        let email = object
            .get("email")
            .and_then(Value::as_str)
            .ok_or(IdentityError::MissingEmail)?;
        let email = Email::parse(email)?;

        let display_name = ["display_name", "username", "user_name", "name"]
            .iter()
            .filter_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| email.local_part())
            .to_owned();

        let role = object
            .get("role")
            .and_then(Value::as_str)
            .and_then(AccountRole::from_label)
            .unwrap_or_else(|| {
                let flagged = ["is_admin", "is_staff", "is_superuser"]
                    .iter()
                    .any(|key| object.get(*key).and_then(Value::as_bool) == Some(true));
                if flagged {
                    AccountRole::Administrator
                } else {
                    AccountRole::Shopper
                }
            });

        Self::new(id, display_name, email, role)
    }

    /// Backend user ID.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Name shown in the UI.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Account email.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Role the backend assigned.
    #[must_use]
    pub const fn role(&self) -> AccountRole {
        self.role
    }
}

impl TryFrom<Value> for Identity {
    type Error = IdentityError;

    fn try_from(record: Value) -> Result<Self, Self::Error> {
        Self::from_server(&record)
    }
}
