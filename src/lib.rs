//! Client-side auth gating for protected views.
//!
//! This crate provides the pieces needed to gate arbitrary protected content
//! behind a locally held authentication token:
//! - [`CredentialStore`]: pluggable token persistence (file, OS keychain, memory)
//! - [`validate`]: a pure structural/expiry check for JWT-shaped tokens
//! - [`AuthGate`]: a one-shot state machine that reads, validates, and either
//!   admits the caller or clears the token and redirects to sign-in
//!
//! The gate is a UX-level convenience, not a security boundary: it performs
//! no signature verification and trusts nothing beyond what the server will
//! re-check on every request. The embedding view layer observes [`GateState`]
//! and decides what to paint for each state.

pub mod gate;
pub mod store;
pub mod token;

pub use gate::{AuthGate, GateState, Navigator};
pub use store::{CredentialStore, FileStore, KeyringStore, MemoryStore, CREDENTIAL_KEY};
pub use token::{validate, InvalidReason, ValidationOutcome};
