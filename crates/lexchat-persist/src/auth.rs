use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The authenticated user on whose behalf operations run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Authentication collaborator: current principal plus change notifications.
///
/// `None` means nobody is signed in, which callers treat as "persistence
/// unavailable" rather than a failure.
pub trait AuthProvider: Send + Sync {
    fn current_principal(&self) -> Option<Principal>;

    /// Receiver that is marked changed whenever the principal changes
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;
}

/// In-process auth state for one client session
pub struct SessionAuth {
    tx: watch::Sender<Option<Principal>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn signed_in(principal: Principal) -> Self {
        let auth = Self::new();
        auth.sign_in(principal);
        auth
    }

    pub fn sign_in(&self, principal: Principal) {
        self.set(Some(principal));
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    /// Replace the principal, notifying subscribers only on an actual change.
    pub fn set(&self, next: Option<Principal>) {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(
                user_id = next.as_ref().map(|p| p.user_id.as_str()),
                "Session principal changed"
            );
            *current = next;
            true
        });
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for SessionAuth {
    fn current_principal(&self) -> Option<Principal> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.tx.subscribe()
    }
}
