//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was not accepted as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email is longer than {} characters", Email::MAX_LENGTH)]
    TooLong,
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// No `@`, or nothing on one side of it.
    #[error("email must look like name@domain")]
    Malformed,
}

/// An account email as reported by the backend.
///
/// Only the shape is checked; the backend decides whether an address is
/// acceptable for an account. Surrounding whitespace is trimmed.
///
/// ```
/// use sneakershelf_core::Email;
///
/// let email = Email::parse(" admin@sneakershelf.com ").unwrap();
/// assert_eq!(email.local_part(), "admin");
/// assert!(Email::parse("admin@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// # Errors
    ///
    /// Returns `EmailError` if the trimmed input is not `local@domain`.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let trimmed = raw.trim();
        match trimmed {
            "" => Err(EmailError::Empty),
            s if s.len() > Self::MAX_LENGTH => Err(EmailError::TooLong),
            s if s.contains(char::is_whitespace) => Err(EmailError::Whitespace),
            s => match s.rsplit_once('@') {
                Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                    Ok(Self(s.to_owned()))
                }
                _ => Err(EmailError::Malformed),
            },
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the last `@`; the fallback display name for accounts
    /// without one.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_backend_addresses() {
        for raw in [
            "admin@sneakershelf.com",
            "user@sneakershelf.com",
            "jane+orders@example.com",
            "a@b.c",
        ] {
            assert_eq!(Email::parse(raw).unwrap().as_str(), raw);
        }
        assert_eq!(
            Email::parse("\tuser@sneakershelf.com \n").unwrap().as_str(),
            "user@sneakershelf.com"
        );
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("  "), Err(EmailError::Empty));
        assert_eq!(Email::parse("jane doe@x.com"), Err(EmailError::Whitespace));
        assert_eq!(Email::parse("jane"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@x.com"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("jane@"), Err(EmailError::Malformed));
        let long = format!("{}@sneakershelf.com", "x".repeat(Email::MAX_LENGTH));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong));
    }

    #[test]
    fn test_local_part_uses_last_at() {
        let email = Email::parse("\"odd@name\"@sneakershelf.com").unwrap();
        assert_eq!(email.local_part(), "\"odd@name\"");
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let email: Email = serde_json::from_str("\"user@sneakershelf.com\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"user@sneakershelf.com\"");
        assert!(serde_json::from_str::<Email>("\"nobody\"").is_err());
    }
}
