//! Form drafts and field-level validation.
//!
//! Every validator returns a [`FieldErrors`] map; an empty map means the
//! draft may be submitted. Backend error payloads are converted into the
//! same shape by [`FieldErrors::from_payload`], so a rejected signup renders
//! exactly like a local validation failure.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Value, json};

use crate::cart::Cart;

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const MIN_PASSWORD_CHARS: usize = 6;
const MIN_NAME_CHARS: usize = 2;

/// Loose `something@something.something` shape check.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("Invalid regex"));

// =============================================================================
// FieldErrors
// =============================================================================

/// Field name to message, in the order the errors were found.
///
/// Only the first message per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a message unless the field already has one.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        if self.get(&field).is_none() {
            self.entries.push((field, message.into()));
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    /// Convert a backend error payload.
    ///
    /// Accepts `{field: "msg"}`, `{field: ["msg", ...]}`, `{error: "msg"}`,
    /// `{detail: "msg"}` and bare strings. `error` and `detail` land under
    /// [`NON_FIELD_ERRORS`].
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let mut errors = Self::new();

        match payload {
            Value::Object(map) => {
                for (key, value) in map {
                    let Some(message) = first_message(value) else {
                        continue;
                    };
                    let field = match key.as_str() {
                        "error" | "detail" => NON_FIELD_ERRORS,
                        other => other,
                    };
                    errors.insert(field, message);
                }
            }
            Value::String(s) if !s.trim().is_empty() => {
                errors.insert(NON_FIELD_ERRORS, s.trim());
            }
            Value::Array(_) => {
                if let Some(message) = first_message(payload) {
                    errors.insert(NON_FIELD_ERRORS, message);
                }
            }
            _ => {}
        }

        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            if field == NON_FIELD_ERRORS {
                f.write_str(message)?;
            } else {
                write!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, message) in &self.entries {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Array(values) => values.iter().find_map(first_message),
        Value::Object(map) => map.values().find_map(first_message),
        _ => None,
    }
}

// =============================================================================
// Field rules
// =============================================================================

fn check_email(errors: &mut FieldErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !EMAIL_SHAPE.is_match(email) {
        errors.insert("email", "Email is invalid");
    }
}

fn check_password(errors: &mut FieldErrors, password: &SecretString) {
    let password = password.expose_secret();
    if password.trim().is_empty() {
        errors.insert("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert("password", "Password must be at least 6 characters");
    }
}

fn check_required(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Credentials typed into a login form.
#[derive(Debug)]
pub struct LoginDraft {
    pub email: String,
    pub password: SecretString,
}

impl LoginDraft {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        errors
    }

    /// Body for `POST /login/`.
    #[must_use]
    pub fn to_request(&self) -> Value {
        json!({
            "email": self.email.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

/// Registration form.
#[derive(Debug)]
pub struct SignupDraft {
    pub user_name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignupDraft {
    #[must_use]
    pub fn new(
        user_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
            confirm_password: SecretString::from(confirm_password.into()),
        }
    }

    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let name = self.user_name.trim();
        if name.is_empty() {
            errors.insert("user_name", "Name is required");
        } else if name.chars().count() < MIN_NAME_CHARS {
            errors.insert("user_name", "Name must be at least 2 characters");
        }

        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);

        let confirm = self.confirm_password.expose_secret();
        if confirm.trim().is_empty() {
            errors.insert("confirmPassword", "Please confirm your password");
        } else if confirm != self.password.expose_secret() {
            errors.insert("confirmPassword", "Passwords do not match");
        }

        errors
    }

    /// Body for `POST /signup/`. The confirmation never leaves the client.
    #[must_use]
    pub fn to_request(&self) -> Value {
        json!({
            "user_name": self.user_name.trim(),
            "email": self.email.trim(),
            "password": self.password.expose_secret(),
        })
    }
}

/// Shipping details collected at checkout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
    /// Leave unset to let the backend apply its flat rate.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::str_option"
    )]
    pub shipping_cost: Option<Decimal>,
}

impl CheckoutDraft {
    /// Validate the draft against the cart it would order.
    #[must_use]
    pub fn validate(&self, cart: &Cart) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if cart.is_empty() {
            errors.insert("cart", "Cart is empty");
        }

        if self.full_name.trim().chars().count() < MIN_NAME_CHARS {
            errors.insert("full_name", "Please enter a valid full name");
        }
        check_email(&mut errors, &self.email);
        check_required(&mut errors, "phone", &self.phone, "Phone number is required");
        check_required(&mut errors, "address", &self.address, "Address is required");
        check_required(&mut errors, "city", &self.city, "City is required");
        check_required(
            &mut errors,
            "postal_code",
            &self.postal_code,
            "Postal code is required",
        );
        check_required(&mut errors, "country", &self.country, "Country is required");

        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_login_rules() {
        let errors = LoginDraft::new("", "").validate();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let errors = LoginDraft::new("not-an-email", "12345").validate();
        assert_eq!(errors.get("email"), Some("Email is invalid"));
        assert_eq!(
            errors.get("password"),
            Some("Password must be at least 6 characters")
        );

        assert!(
            LoginDraft::new("admin@sneakershelf.com", "admin123")
                .validate()
                .is_empty()
        );
    }

    #[test]
    fn test_email_shape() {
        for ok in ["a@b.c", " user@sneakershelf.com ", "x.y+z@mail.example.org"] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, ok);
            assert!(errors.is_empty(), "{ok}");
        }
        for bad in ["a@b", "@.", "a@ b.c", "plain"] {
            let mut errors = FieldErrors::new();
            check_email(&mut errors, bad);
            assert_eq!(errors.get("email"), Some("Email is invalid"), "{bad}");
        }
    }

    #[test]
    fn test_signup_mismatched_passwords() {
        let errors = SignupDraft::new("Jane", "jane@example.com", "secret1", "secret2").validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn test_signup_rules() {
        let errors = SignupDraft::new(" ", "", "", "").validate();
        assert_eq!(errors.get("user_name"), Some("Name is required"));
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));
        assert_eq!(
            errors.get("confirmPassword"),
            Some("Please confirm your password")
        );

        let errors = SignupDraft::new("J", "j@x.io", "secret1", "secret1").validate();
        assert_eq!(
            errors.get("user_name"),
            Some("Name must be at least 2 characters")
        );
    }

    #[test]
    fn test_signup_request_omits_confirmation() {
        let body = SignupDraft::new(" Jane ", "jane@example.com", "secret1", "secret1").to_request();
        assert_eq!(
            body,
            json!({"user_name": "Jane", "email": "jane@example.com", "password": "secret1"})
        );
    }

    #[test]
    fn test_errors_keep_first_message_and_order() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "first");
        errors.insert("password", "second");
        errors.insert("email", "ignored");

        let fields: Vec<_> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, ["email", "password"]);
        assert_eq!(errors.get("email"), Some("first"));
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"email": "first", "password": "second"})
        );
    }

    #[test]
    fn test_from_payload_shapes() {
        let errors = FieldErrors::from_payload(&json!({"email": ["Email already exists"]}));
        assert_eq!(errors.get("email"), Some("Email already exists"));

        let errors = FieldErrors::from_payload(&json!({"error": "Invalid credentials"}));
        assert_eq!(errors.get(NON_FIELD_ERRORS), Some("Invalid credentials"));
        assert_eq!(errors.to_string(), "Invalid credentials");

        let errors = FieldErrors::from_payload(&json!({"detail": "Not found."}));
        assert_eq!(errors.get(NON_FIELD_ERRORS), Some("Not found."));

        let errors = FieldErrors::from_payload(&json!("Bad Gateway"));
        assert_eq!(errors.get(NON_FIELD_ERRORS), Some("Bad Gateway"));

        assert!(FieldErrors::from_payload(&Value::Null).is_empty());
        assert!(FieldErrors::from_payload(&json!({"email": []})).is_empty());
    }

    #[test]
    fn test_checkout_rules() {
        let errors = CheckoutDraft::default().validate(&Cart::default());
        assert_eq!(errors.get("cart"), Some("Cart is empty"));
        assert_eq!(errors.get("full_name"), Some("Please enter a valid full name"));
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("phone"), Some("Phone number is required"));
        assert_eq!(errors.get("address"), Some("Address is required"));
        assert_eq!(errors.get("city"), Some("City is required"));
        assert_eq!(errors.get("postal_code"), Some("Postal code is required"));
        assert_eq!(errors.get("country"), Some("Country is required"));
    }

    #[test]
    fn test_checkout_payload_skips_unset_fields() {
        let draft = CheckoutDraft {
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "USA".to_string(),
            ..CheckoutDraft::default()
        };
        let body = serde_json::to_value(&draft).unwrap();
        assert!(body.get("notes").is_none());
        assert!(body.get("shipping_cost").is_none());
        assert_eq!(body["full_name"], "Jane Doe");
    }
}
