//! Login, signup, logout and identity commands.

use sneakershelf_client::Storefront;
use sneakershelf_client::forms::{LoginDraft, SignupDraft};
use sneakershelf_client::guard::View;
use sneakershelf_client::session::Session;
use tracing::info;

use super::CliError;

/// Log in through the shopper or admin entry point.
///
/// # Errors
///
/// Returns an error if validation fails or the backend refuses the login.
pub async fn login(
    storefront: &Storefront,
    admin: bool,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let entry = if admin { View::AdminLogin } else { View::Login };
    let draft = LoginDraft::new(email, password);

    let outcome = storefront.login(entry, &draft).await?;

    info!(
        "Logged in as {} <{}> ({})",
        outcome.identity.display_name(),
        outcome.identity.email(),
        outcome.identity.role()
    );
    if admin && outcome.destination != View::AdminDashboard {
        info!("This account has no admin access");
    }
    info!("Next: {}", outcome.destination);
    Ok(())
}

/// Register a new account.
///
/// # Errors
///
/// Returns an error if validation fails or the backend refuses the signup.
pub async fn signup(
    storefront: &Storefront,
    name: String,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<(), CliError> {
    let draft = SignupDraft::new(name, email, password, confirm_password);
    let registered = storefront.signup(&draft).await?;

    info!(
        "{}",
        registered
            .message
            .as_deref()
            .unwrap_or("Account created")
    );
    info!(
        "Log in as {} to continue ({})",
        registered.identity.email(),
        registered.destination
    );
    Ok(())
}

/// Log out and forget the persisted session.
///
/// # Errors
///
/// Returns an error if the session file cannot be removed.
pub async fn logout(storefront: &Storefront) -> Result<(), CliError> {
    let was_authenticated = storefront.session().is_authenticated();
    storefront.logout().await?;

    if was_authenticated {
        info!("Logged out");
    } else {
        info!("Not logged in");
    }
    Ok(())
}

/// Show the current identity.
pub fn whoami(storefront: &Storefront) {
    match storefront.session().current() {
        Session::Anonymous => info!("Not logged in"),
        Session::Authenticated(identity) => info!(
            id = %identity.id(),
            "{} <{}> ({})",
            identity.display_name(),
            identity.email(),
            identity.role()
        ),
    }
}
