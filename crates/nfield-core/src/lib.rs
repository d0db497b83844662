//! Client library for the Nfield survey-management API.
//!
//! The [`auth::SessionManager`] owns the authentication token: it signs in
//! on demand, reuses a token for 12 minutes, can rotate it on a background
//! timer, and serializes concurrent sign-ins. [`api::NfieldClient`] wraps
//! the REST endpoints (fieldwork, default texts, translations, languages,
//! settings) on top of it.
//!
//! ```no_run
//! use nfield_core::{Credentials, NfieldClient, SessionConfig};
//!
//! # async fn run() -> Result<(), nfield_core::ApiError> {
//! let client = NfieldClient::new(SessionConfig::new(Credentials::new("domain", "user", "secret")))?;
//! client.connect(true, None).await?;
//! let status = client.fieldwork_status("survey-id").await?;
//! println!("{} {}", status.status, status.body);
//! client.stop_persistent();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, ApiRequest, ApiResponse, HttpTransport, NfieldClient, Transport};
pub use auth::{CredentialStore, RefreshErrorCallback, SessionManager, Token};
pub use config::{Credentials, SessionConfig, TransportOptions, DEFAULT_SERVER};
