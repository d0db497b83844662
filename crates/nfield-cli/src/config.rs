//! CLI configuration management.
//!
//! Stores the server URL, domain and last used username at
//! `~/.config/nfield-cli/config.json`. `NFIELD_SERVER`, `NFIELD_DOMAIN` and
//! `NFIELD_USERNAME` override the stored values for one run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use nfield_core::{Credentials, SessionConfig, DEFAULT_SERVER};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "nfield-cli";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub server: Option<String>,
    pub domain: Option<String>,
    pub username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `NFIELD_*` overrides looked up through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(server) = lookup("NFIELD_SERVER") {
            self.server = Some(server);
        }
        if let Some(domain) = lookup("NFIELD_DOMAIN") {
            self.domain = Some(domain);
        }
        if let Some(username) = lookup("NFIELD_USERNAME") {
            self.username = Some(username);
        }
    }

    pub fn server(&self) -> &str {
        self.server.as_deref().unwrap_or(DEFAULT_SERVER)
    }

    /// Domain and username, failing with a hint when either is missing
    pub fn account(&self) -> Result<(&str, &str)> {
        let domain = self
            .domain
            .as_deref()
            .context("No domain configured. Run `nfield login` or set NFIELD_DOMAIN")?;
        let username = self
            .username
            .as_deref()
            .context("No username configured. Run `nfield login` or set NFIELD_USERNAME")?;
        Ok((domain, username))
    }

    pub fn session_config(&self, password: String) -> Result<SessionConfig> {
        let (domain, username) = self.account()?;
        Ok(SessionConfig::new(Credentials::new(domain, username, password)).with_server(self.server()))
    }
}
