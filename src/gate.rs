//! The auth gate state machine.
//!
//! A gate wraps one mount of a protected view. On activation it reads the
//! credential store, validates the token, and settles into exactly one
//! terminal state. The embedding view layer decides what to paint for each
//! state; the gate only reports `GateState` and fires the sign-in redirect
//! on the invalid path.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::CredentialStore;
use crate::token::{validate, ValidationOutcome};

/// Default destination for the sign-in redirect
const SIGN_IN_PATH: &str = "/signin";

/// Render state of a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Activation has not completed; paint a progress indicator.
    Initializing,
    /// Token checked out; protected content may be shown.
    Authenticated,
    /// Token absent or invalid; paint nothing, a redirect has been issued.
    Unauthenticated,
}

impl GateState {
    /// Whether protected content may be rendered in this state.
    pub fn allows_content(&self) -> bool {
        matches!(self, GateState::Authenticated)
    }

    /// Whether this state is terminal for the current activation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateState::Initializing)
    }
}

/// Fire-and-forget client-side navigation.
///
/// The gate never waits for, verifies, or retries a navigation.
pub trait Navigator {
    fn navigate(&self, path: &str);
}

/// One-shot gate over a single mount of a protected view.
///
/// Collaborators are injected so the gate is testable without a rendering
/// environment. The store is mutated only on the invalid path (cleared);
/// a valid token is never touched.
pub struct AuthGate<'a> {
    store: &'a dyn CredentialStore,
    navigator: &'a dyn Navigator,
    sign_in_path: String,
    state: GateState,
}

impl<'a> AuthGate<'a> {
    pub fn new(store: &'a dyn CredentialStore, navigator: &'a dyn Navigator) -> Self {
        Self {
            store,
            navigator,
            sign_in_path: SIGN_IN_PATH.to_string(),
            state: GateState::Initializing,
        }
    }

    /// Override the sign-in destination.
    pub fn with_sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Current state, without re-validating.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Run the check against the wall clock. See [`Self::activate_at`].
    pub fn activate(&mut self) -> GateState {
        self.activate_at(Utc::now())
    }

    /// Read the store, validate the token at `now`, and transition to a
    /// terminal state. The first call decides; later calls return the
    /// settled state without touching the store or the navigator again.
    ///
    /// On an invalid token the stale credential is cleared and a single
    /// fire-and-forget redirect to the sign-in path is issued.
    pub fn activate_at(&mut self, now: DateTime<Utc>) -> GateState {
        if self.state.is_terminal() {
            return self.state;
        }

        let token = self.store.read();
        match validate(token.as_deref(), now) {
            ValidationOutcome::Valid => {
                debug!("Token valid, admitting protected content");
                self.state = GateState::Authenticated;
            }
            ValidationOutcome::Invalid(reason) => {
                debug!(
                    "Token rejected ({}), redirecting to {}",
                    reason, self.sign_in_path
                );
                self.store.clear();
                self.navigator.navigate(&self.sign_in_path);
                self.state = GateState::Unauthenticated;
            }
        }
        self.state
    }
}
