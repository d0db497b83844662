use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "nfield-cli";

/// Passwords kept in the OS keychain, keyed by `domain/username`.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(domain: &str, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &Self::account(domain, username))
            .context("Failed to create keyring entry")
    }

    fn account(domain: &str, username: &str) -> String {
        format!("{}/{}", domain, username)
    }

    /// Store the password for a domain user in the OS keychain
    pub fn store(domain: &str, username: &str, password: &str) -> Result<()> {
        Self::entry(domain, username)?
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the password for a domain user from the OS keychain
    pub fn get_password(domain: &str, username: &str) -> Result<String> {
        Self::entry(domain, username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete the stored password for a domain user
    pub fn delete(domain: &str, username: &str) -> Result<()> {
        Self::entry(domain, username)?
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_credentials(domain: &str, username: &str) -> bool {
        Self::entry(domain, username)
            .and_then(|entry| entry.get_password().map_err(Into::into))
            .is_ok()
    }
}
