//! Authorization tiers.
//!
//! Two enums keep the "administrator without an identity" state
//! unrepresentable: [`AccountRole`] is what an authenticated identity
//! carries, and [`Role`] is the tier derived from a session, which adds
//! `Anonymous` for the unauthenticated case.

use serde::{Deserialize, Serialize};

/// Role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Regular customer account.
    #[default]
    Shopper,
    /// Store staff with access to administrative views.
    Administrator,
}

impl AccountRole {
    /// Interpret a role label sent by the backend.
    ///
    /// Unknown labels map to `None` so the caller can fall back to other
    /// signals in the identity record.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" | "staff" | "superuser" => Some(Self::Administrator),
            "user" | "shopper" | "customer" => Some(Self::Shopper),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shopper => write!(f, "shopper"),
            Self::Administrator => write!(f, "administrator"),
        }
    }
}

/// Authorization tier derived from the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No authenticated identity.
    #[default]
    Anonymous,
    /// Authenticated customer.
    Shopper,
    /// Authenticated administrator.
    Administrator,
}

impl From<AccountRole> for Role {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::Shopper => Self::Shopper,
            AccountRole::Administrator => Self::Administrator,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Shopper => write!(f, "shopper"),
            Self::Administrator => write!(f, "administrator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(AccountRole::from_label("admin"), Some(AccountRole::Administrator));
        assert_eq!(AccountRole::from_label(" Administrator "), Some(AccountRole::Administrator));
        assert_eq!(AccountRole::from_label("user"), Some(AccountRole::Shopper));
        assert_eq!(AccountRole::from_label("wizard"), None);
    }

    #[test]
    fn test_account_role_maps_to_role() {
        assert_eq!(Role::from(AccountRole::Shopper), Role::Shopper);
        assert_eq!(Role::from(AccountRole::Administrator), Role::Administrator);
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::Anonymous.to_string(), "anonymous");
        assert_eq!(AccountRole::Administrator.to_string(), "administrator");
    }
}
