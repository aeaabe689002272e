//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! The backend assigns integer primary keys but the client never does
//! arithmetic on them, so IDs are held as opaque strings. Deserialization
//! accepts either a JSON number or a JSON string; serialization always
//! produces a string.

use serde::Deserialize;

/// Wire representation accepted when deserializing an ID.
#[doc(hidden)]
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string, `Deserialize` from a string or integer
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>`, `From<i64>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use sneakershelf_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("1");
/// let order_id = OrderId::new("1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                match <$crate::types::id::RawId as ::serde::Deserialize>::deserialize(
                    deserializer,
                )? {
                    $crate::types::id::RawId::Number(n) => Ok(Self(n.to_string())),
                    $crate::types::id::RawId::Text(s) if s.trim().is_empty() => Err(
                        <D::Error as ::serde::de::Error>::custom(concat!(
                            stringify!($name),
                            " cannot be empty"
                        )),
                    ),
                    $crate::types::id::RawId::Text(s) => Ok(Self(s)),
                }
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(SizeId);
define_id!(CartItemId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_number() {
        let id: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_deserialize_from_string() {
        let id: SizeId = serde_json::from_str("\"9\"").unwrap();
        assert_eq!(id, SizeId::new("9"));
    }

    #[test]
    fn test_deserialize_rejects_blank() {
        assert!(serde_json::from_str::<CartItemId>("\"  \"").is_err());
    }

    #[test]
    fn test_serialize_as_string() {
        let id = CartItemId::from(7_i64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }

    #[test]
    fn test_display_and_parse() {
        let id: OrderId = "ORD-1".parse().unwrap();
        assert_eq!(id.to_string(), "ORD-1");
    }
}
