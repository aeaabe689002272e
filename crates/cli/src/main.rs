//! Sneakershelf CLI - Storefront client for the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in as a shopper (password may also come from SHELF_PASSWORD)
//! shelf-cli login -e user@sneakershelf.com -p password
//!
//! # Log in through the admin entry
//! shelf-cli login --admin -e admin@sneakershelf.com -p admin123
//!
//! # Work with the cart
//! shelf-cli cart add 1 --size 9 -q 2
//! shelf-cli cart show
//! shelf-cli cart update 11 0
//!
//! # Place and track an order
//! shelf-cli checkout --full-name "Jane Doe" --email jane@example.com ...
//! shelf-cli track ORD-20240101-0001
//!
//! # Guarded navigation
//! shelf-cli open /admin/dashboard
//! ```
//!
//! Every invocation restores the session from the session file
//! (`SNEAKERSHELF_SESSION_FILE`, default `~/.sneakershelf/session.json`) and
//! saves it again afterwards, so a login survives between commands.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use sneakershelf_client::{ClientConfig, ClientError, Storefront};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shelf-cli")]
#[command(author, version, about = "Sneakershelf storefront CLI")]
struct Cli {
    /// Backend API root (overrides `SNEAKERSHELF_API_BASE_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides `SNEAKERSHELF_SESSION_FILE`)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        /// Use the admin entry point
        #[arg(long)]
        admin: bool,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHELF_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register a new account
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHELF_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Forget the session and the local cart
    Logout,
    /// Show who is logged in
    Whoami,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        postal_code: String,
        #[arg(long)]
        country: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Shipping cost (backend default applies when omitted)
        #[arg(long)]
        shipping_cost: Option<Decimal>,
    },
    /// Look up an order's status
    Track {
        /// Order number, e.g. `ORD-20240101-0001`
        order_number: String,
    },
    /// Navigate to a view through the route guard
    Open {
        /// View path, e.g. `/admin/dashboard`
        path: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        product: String,

        /// Size ID
        #[arg(short, long)]
        size: Option<String>,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Change a line's quantity (0 or less removes it)
    Update {
        /// Cart item ID
        item: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Cart item ID
        item: String,
    },
    /// Empty the cart
    Clear,
}

impl Commands {
    /// Commands that act on the cart cannot run against a cart that failed
    /// to load.
    const fn needs_cart(&self) -> bool {
        matches!(self, Self::Cart { .. } | Self::Checkout { .. })
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Default session file under the user's home directory.
fn default_session_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".sneakershelf").join("session.json"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = ClientConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shelf_cli=info,sneakershelf_client=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: ClientConfig) -> Result<(), CliError> {
    if let Some(api_url) = &cli.api_url {
        config.api_base_url = ClientConfig::new(api_url)?.api_base_url;
    }
    config.session_file = cli
        .session_file
        .or_else(|| config.session_file.take())
        .or_else(default_session_file);

    let storefront = Storefront::new(config)?;

    if let Err(e) = storefront.bootstrap().await {
        if cli.command.needs_cart() {
            return Err(e.into());
        }
        tracing::warn!(error = %e, "Could not load the cart");
    }

    let is_logout = matches!(cli.command, Commands::Logout);
    dispatch(&storefront, cli.command).await?;

    if !is_logout {
        storefront.save_session().await?;
    }
    Ok(())
}

async fn dispatch(storefront: &Storefront, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Login {
            admin,
            email,
            password,
        } => commands::auth::login(storefront, admin, email, password).await?,
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let confirm = confirm_password.unwrap_or_else(|| password.clone());
            commands::auth::signup(storefront, name, email, password, confirm).await?;
        }
        Commands::Logout => commands::auth::logout(storefront).await?,
        Commands::Whoami => commands::auth::whoami(storefront),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(storefront),
            CartAction::Add {
                product,
                size,
                quantity,
            } => commands::cart::add(storefront, &product, size.as_deref(), quantity).await?,
            CartAction::Update { item, quantity } => {
                commands::cart::update(storefront, &item, quantity).await?;
            }
            CartAction::Remove { item } => commands::cart::remove(storefront, &item).await?,
            CartAction::Clear => commands::cart::clear(storefront).await?,
        },
        Commands::Checkout {
            full_name,
            email,
            phone,
            address,
            city,
            postal_code,
            country,
            notes,
            shipping_cost,
        } => {
            let draft = sneakershelf_client::forms::CheckoutDraft {
                full_name,
                email,
                phone,
                address,
                city,
                postal_code,
                country,
                notes,
                shipping_cost,
            };
            commands::orders::checkout(storefront, &draft).await?;
        }
        Commands::Track { order_number } => {
            commands::orders::track(storefront, &order_number).await?;
        }
        Commands::Open { path } => commands::navigate::open(storefront, &path)?,
    }
    Ok(())
}

/// Log a failure the way the user needs to see it and send unexpected
/// failures to Sentry.
fn report(error: &CliError) {
    if let CliError::Client(client_error) = error {
        if !matches!(client_error, ClientError::Validation(_)) {
            sentry::capture_error(client_error);
        }
        for (field, message) in client_error.field_errors().iter() {
            tracing::error!(field, "{message}");
        }
        return;
    }

    tracing::error!("Command failed: {error}");
}
