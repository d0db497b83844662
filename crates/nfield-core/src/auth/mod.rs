//! Authentication module for the Nfield API.
//!
//! This module provides:
//! - `SessionManager`: token cache with freshness checks and optional
//!   background refresh
//! - `CredentialStore`: OS-level password storage via keyring
//!
//! Tokens are trusted for 12 minutes after sign-in; the service expires
//! them after 15.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{
    RefreshErrorCallback, SessionManager, Token, REFRESH_INTERVAL_MINUTES, TOKEN_VALIDITY_MINUTES,
};
