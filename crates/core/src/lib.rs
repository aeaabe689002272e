//! Sneakershelf Core - Shared types library.
//!
//! This crate provides common types used across all Sneakershelf components:
//! - `client` - Session, cart and request layer of the storefront client
//! - `cli` - Command-line front end driving the client
//! - `integration-tests` - Mock backend and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere, including
//! the end-to-end tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
