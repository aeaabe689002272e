//! Route guard for privileged views.
//!
//! The guard reads the session at the moment of the decision and never
//! caches. Administrative views need an administrator; everything else is
//! open to every role. A denial always comes with the view to send the user
//! to instead.
//!
//! # Example
//!
//! ```rust,ignore
//! match guard::decide(View::AdminDashboard, &store.current()) {
//!     GuardDecision::Allow => render_dashboard(),
//!     GuardDecision::Redirect { to } => navigator.navigate(to),
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use sneakershelf_core::Role;
use tracing::debug;

use crate::session::Session;

/// Every view the storefront can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Home,
    Login,
    AdminLogin,
    Signup,
    Checkout,
    AdminDashboard,
}

impl View {
    pub const ALL: [Self; 6] = [
        Self::Home,
        Self::Login,
        Self::AdminLogin,
        Self::Signup,
        Self::Checkout,
        Self::AdminDashboard,
    ];

    /// Route path for this view.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::AdminLogin => "/admin/login",
            Self::Signup => "/signup",
            Self::Checkout => "/checkout",
            Self::AdminDashboard => "/admin/dashboard",
        }
    }

    /// Look up a view by route path. A trailing slash is ignored.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Self::ALL.into_iter().find(|view| view.path() == path)
    }

    /// Minimum role needed to enter.
    #[must_use]
    pub const fn required_role(self) -> Role {
        match self {
            Self::AdminDashboard => Role::Administrator,
            _ => Role::Anonymous,
        }
    }

    /// Whether entering needs more than an anonymous session.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        !matches!(self.required_role(), Role::Anonymous)
    }

    /// Login view for the privilege tier this view belongs to.
    #[must_use]
    pub const fn entry_view(self) -> Self {
        match self.required_role() {
            Role::Administrator => Self::AdminLogin,
            Role::Anonymous | Role::Shopper => Self::Login,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s).ok_or_else(|| format!("unknown view `{s}`"))
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Access denied; go here instead.
    Redirect { to: View },
}

/// Whether `session` may enter `view`.
#[must_use]
pub fn can_enter(view: View, session: &Session) -> bool {
    match view.required_role() {
        Role::Anonymous => true,
        Role::Shopper => session.is_authenticated(),
        Role::Administrator => session.is_admin(),
    }
}

/// Allow, or redirect to the view's entry point.
#[must_use]
pub fn decide(view: View, session: &Session) -> GuardDecision {
    if can_enter(view, session) {
        GuardDecision::Allow
    } else {
        let to = view.entry_view();
        debug!(view = %view, redirect = %to, role = %session.role(), "Route guard denied entry");
        GuardDecision::Redirect { to }
    }
}

/// Something that can switch the visible view.
pub trait Navigator {
    fn navigate(&mut self, view: View);
}

/// Evaluate the guard and navigate to `view` or its redirect.
///
/// Returns the view actually navigated to.
pub fn enter<N: Navigator + ?Sized>(view: View, session: &Session, navigator: &mut N) -> View {
    let target = match decide(view, session) {
        GuardDecision::Allow => view,
        GuardDecision::Redirect { to } => to,
    };
    navigator.navigate(target);
    target
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sneakershelf_core::{AccountRole, Email, UserId};

    use super::*;
    use crate::session::Identity;

    fn session(role: Option<AccountRole>) -> Session {
        role.map_or(Session::Anonymous, |role| {
            Session::Authenticated(
                Identity::new(
                    UserId::new("1"),
                    "Someone",
                    Email::parse("someone@sneakershelf.com").unwrap(),
                    role,
                )
                .unwrap(),
            )
        })
    }

    #[derive(Default)]
    struct Recorder(Vec<View>);

    impl Navigator for Recorder {
        fn navigate(&mut self, view: View) {
            self.0.push(view);
        }
    }

    #[test]
    fn test_admin_view_requires_administrator() {
        assert_eq!(
            decide(View::AdminDashboard, &session(None)),
            GuardDecision::Redirect {
                to: View::AdminLogin
            }
        );
        assert_eq!(
            decide(View::AdminDashboard, &session(Some(AccountRole::Shopper))),
            GuardDecision::Redirect {
                to: View::AdminLogin
            }
        );
        assert_eq!(
            decide(
                View::AdminDashboard,
                &session(Some(AccountRole::Administrator))
            ),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_other_views_open_to_everyone() {
        let sessions = [
            session(None),
            session(Some(AccountRole::Shopper)),
            session(Some(AccountRole::Administrator)),
        ];
        for view in View::ALL.into_iter().filter(|v| !v.is_protected()) {
            for session in &sessions {
                assert!(can_enter(view, session), "{view} for {}", session.role());
            }
        }
    }

    #[test]
    fn test_paths_round_trip() {
        for view in View::ALL {
            assert_eq!(View::from_path(view.path()), Some(view));
        }
        assert_eq!(View::from_path("/admin/dashboard/"), Some(View::AdminDashboard));
        assert_eq!(View::from_path("/"), Some(View::Home));
        assert_eq!(View::from_path("/nowhere"), None);
        assert!("/nowhere".parse::<View>().is_err());
    }

    #[test]
    fn test_enter_navigates_to_redirect() {
        let mut nav = Recorder::default();
        let landed = enter(View::AdminDashboard, &session(None), &mut nav);
        assert_eq!(landed, View::AdminLogin);

        let landed = enter(View::Checkout, &session(None), &mut nav);
        assert_eq!(landed, View::Checkout);

        assert_eq!(nav.0, [View::AdminLogin, View::Checkout]);
    }

    #[test]
    fn test_decision_follows_current_session() {
        let mut current = session(Some(AccountRole::Administrator));
        assert_eq!(decide(View::AdminDashboard, &current), GuardDecision::Allow);

        current = current.apply(crate::session::SessionCommand::Logout);
        assert!(matches!(
            decide(View::AdminDashboard, &current),
            GuardDecision::Redirect { .. }
        ));
    }
}
