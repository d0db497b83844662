//! REST API client module for the Nfield survey service.
//!
//! This module provides the `NfieldClient` endpoint wrappers and the
//! `Transport` abstraction they send through. Every authenticated call
//! carries the session token as `Authorization: Basic <token>`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::NfieldClient;
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
