//! Session configuration for the Nfield API client.
//!
//! A `SessionConfig` bundles the server URL, the sign-in credentials and
//! the options used to build the HTTP transport. It is replaced wholesale
//! on reconfiguration; nested fields are never merged.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Public Nfield API endpoint used when no server is configured
pub const DEFAULT_SERVER: &str = "https://api.nfieldmr.com/";

/// Sign-in credentials, sent to `v1/SignIn` as-is.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    pub domain: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Options applied to the underlying HTTP client.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Total request timeout. Requests never time out when unset.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Headers sent with every request, including sign-in
    pub default_headers: BTreeMap<String, String>,
    /// Proxy URL for all traffic
    pub proxy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server: String,
    pub credentials: Credentials,
    pub transport: TransportOptions,
}

impl SessionConfig {
    /// Config against the public Nfield server with default transport options
    pub fn new(credentials: Credentials) -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            credentials,
            transport: TransportOptions::default(),
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }
}
