//! Guarded navigation.

use sneakershelf_client::Storefront;
use sneakershelf_client::guard::{Navigator, View};
use tracing::info;

use super::CliError;

/// Reports the view that would be shown.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&mut self, view: View) {
        info!("Showing {view}");
    }
}

/// Open a view by path, following the guard's redirect if access is denied.
///
/// # Errors
///
/// Returns `UnknownView` if the path names no view.
pub fn open(storefront: &Storefront, path: &str) -> Result<(), CliError> {
    let view = View::from_path(path).ok_or_else(|| CliError::UnknownView(path.to_string()))?;

    let shown = storefront.navigate(view, &mut TerminalNavigator);
    if shown != view {
        info!(
            "Access to {view} denied for {}; redirected to {shown}",
            storefront.session().role()
        );
    }
    Ok(())
}
