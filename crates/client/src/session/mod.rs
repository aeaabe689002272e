//! Session state machine.
//!
//! The session is either `Anonymous` or `Authenticated(identity)`; the role
//! lives inside the identity, so "administrator without an identity" cannot
//! be expressed. State only changes through [`SessionCommand`]s:
//!
//! | Command | From | To |
//! |---|---|---|
//! | `Authenticate(identity)` | any | `Authenticated(identity)` |
//! | `Logout` | any | `Anonymous` (no-op when already anonymous) |
//! | `Hydrate(record)` | any | `Authenticated` if the record is well-formed, else `Anonymous` |
//!
//! [`SessionStore`] applies commands and publishes every change through a
//! `tokio::sync::watch` channel so observers re-render against the latest
//! state.

mod identity;
pub mod persist;

pub use identity::{Identity, IdentityError};

use std::sync::Arc;

use serde_json::Value;
use sneakershelf_core::{AccountRole, Role};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::sync_sentry_user;

/// Current authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Nobody is logged in.
    #[default]
    Anonymous,
    /// The backend confirmed this identity.
    Authenticated(Identity),
}

impl Session {
    /// The authenticated identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    /// Authorization tier derived from the identity.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity()
            .map_or(Role::Anonymous, |identity| identity.role().into())
    }

    /// Whether an identity is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the identity is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity()
            .is_some_and(|identity| identity.role() == AccountRole::Administrator)
    }

    /// Pure transition function.
    #[must_use]
    pub fn apply(self, command: SessionCommand) -> Self {
        match command {
            SessionCommand::Authenticate(identity) => Self::Authenticated(identity),
            SessionCommand::Logout => Self::Anonymous,
            SessionCommand::Hydrate(None) => Self::Anonymous,
            SessionCommand::Hydrate(Some(record)) => match Identity::from_server(&record) {
                Ok(identity) => Self::Authenticated(identity),
                Err(e) => {
                    warn!(error = %e, "Discarding malformed identity during hydrate");
                    Self::Anonymous
                }
            },
        }
    }
}

/// A request to change the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Record an identity the backend has confirmed.
    Authenticate(Identity),
    /// Forget the current identity.
    Logout,
    /// Adopt whatever identity record the server (or the persisted copy)
    /// reports; `None` or a malformed record means anonymous.
    Hydrate(Option<Value>),
}

/// Owner of the process-wide session state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("role", &self.current().role())
            .finish()
    }
}

impl SessionStore {
    /// Create an anonymous session.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            state: Arc::new(state),
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Current authorization tier.
    #[must_use]
    pub fn role(&self) -> Role {
        self.state.borrow().role()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Whether an administrator is logged in.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Observe session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Apply a command and return the resulting session.
    ///
    /// Observers are only notified when the state actually changes.
    pub fn apply(&self, command: SessionCommand) -> Session {
        let mut next = Session::Anonymous;
        self.state.send_if_modified(|session| {
            let updated = session.clone().apply(command);
            let changed = *session != updated;
            if changed {
                *session = updated;
            }
            next = session.clone();
            changed
        });

        sync_sentry_user(next.identity());
        next
    }

    /// Record an identity confirmed by the backend.
    pub fn authenticate(&self, identity: Identity) -> Session {
        info!(
            user_id = %identity.id(),
            role = %identity.role(),
            "Session authenticated"
        );
        self.apply(SessionCommand::Authenticate(identity))
    }

    /// Return to anonymous. Calling this while anonymous does nothing.
    pub fn logout(&self) -> Session {
        if !self.is_authenticated() {
            debug!("Logout while anonymous ignored");
            return Session::Anonymous;
        }
        info!("Session logged out");
        self.apply(SessionCommand::Logout)
    }

    /// Adopt a server-reported identity record, or anonymous if absent or
    /// malformed.
    pub fn hydrate(&self, record: Option<Value>) -> Session {
        let session = self.apply(SessionCommand::Hydrate(record));
        debug!(role = %session.role(), "Session hydrated");
        session
    }
}
