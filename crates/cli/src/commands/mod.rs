//! Command implementations.
//!
//! Results are reported through `tracing` at `info`; failures bubble up as
//! [`CliError`] and are logged by `main`.

pub mod auth;
pub mod cart;
pub mod navigate;
pub mod orders;

use sneakershelf_client::{ClientError, ConfigError};
use thiserror::Error;

/// Errors that end a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A storefront operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The path does not name a view.
    #[error("Unknown view: {0}")]
    UnknownView(String),
}
