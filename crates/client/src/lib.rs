//! Sneakershelf storefront client.
//!
//! Everything a front end needs to talk to the Sneakershelf backend:
//!
//! - [`gateway`] - The single chokepoint for backend calls
//! - [`session`] - Identity and role state machine, with on-disk persistence
//! - [`cart`] - Cart store reconciled from server snapshots
//! - [`guard`] - Route guard for administrative views
//! - [`forms`] - Form drafts and field validation
//! - [`orders`] - Checkout and order tracking
//! - [`Storefront`] - Facade wiring the pieces together
//!
//! # Example
//!
//! ```rust,ignore
//! use sneakershelf_client::{ClientConfig, Storefront, forms::LoginDraft, guard::View};
//!
//! let storefront = Storefront::new(ClientConfig::from_env()?)?;
//! storefront.bootstrap().await?;
//!
//! let outcome = storefront
//!     .login(View::Login, &LoginDraft::new("user@sneakershelf.com", "password"))
//!     .await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod guard;
pub mod orders;
pub mod session;
mod storefront;

pub use config::{CartOrdering, ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use storefront::{LoginOutcome, Registered, Storefront};
