//! Nfield CLI - command-line access to the Nfield survey API.
//!
//! Signs in with the configured domain account and runs one request per
//! invocation: fieldwork control, languages, translations, settings and
//! default texts.

mod commands;
mod config;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use nfield_core::{CredentialStore, NfieldClient};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Command, USAGE};
use config::Config;

/// Password source checked before the keychain
const PASSWORD_ENV: &str = "NFIELD_PASSWORD";

/// Directory for the optional daily log file
const LOG_DIR_ENV: &str = "NFIELD_LOG_DIR";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file on drop.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "nfield.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn env_password(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let password = lookup(PASSWORD_ENV)?;
    debug!("Using password from {}", PASSWORD_ENV);
    Some(password)
}

fn prompt_password(domain: &str, username: &str) -> Result<String> {
    rpassword::prompt_password(format!("Password for {}\\{}: ", domain, username))
        .context("Failed to read password")
}

/// Password from the environment, then the keychain, then a prompt
fn resolve_password(domain: &str, username: &str) -> Result<String> {
    if let Some(password) = env_password(|key| std::env::var(key).ok()) {
        return Ok(password);
    }
    match CredentialStore::get_password(domain, username) {
        Ok(password) => Ok(password),
        Err(e) => {
            debug!(error = %e, "No stored password");
            prompt_password(domain, username)
        }
    }
}

async fn login(config: &mut Config) -> Result<()> {
    if config.domain.is_none() {
        config.domain = Some(prompt_line("Domain")?);
    }
    if config.username.is_none() {
        config.username = Some(prompt_line("Username")?);
    }
    let (domain, username) = config.account()?;
    let (domain, username) = (domain.to_string(), username.to_string());

    let password = match env_password(|key| std::env::var(key).ok()) {
        Some(password) => password,
        None => prompt_password(&domain, &username)?,
    };

    let client = NfieldClient::new(config.session_config(password.clone())?)?;
    let token = client.connect(false, None).await?;
    info!(issued_at = ?token.issued_at, "Login succeeded");

    if let Err(e) = CredentialStore::store(&domain, &username, &password) {
        warn!(error = %e, "Failed to store password in keychain");
    }
    config.save()?;
    println!("Signed in as {}\\{}", domain, username);
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    let (domain, username) = config.account()?;
    if CredentialStore::has_credentials(domain, username) {
        CredentialStore::delete(domain, username)?;
        println!("Removed stored password for {}\\{}", domain, username);
    } else {
        println!("No stored password for {}\\{}", domain, username);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let mut config = Config::load()?;
    config.apply_overrides(|key| std::env::var(key).ok());

    match command {
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        Command::Login => return login(&mut config).await,
        Command::Logout => return logout(&config),
        _ => {}
    }

    let (domain, username) = config.account()?;
    let password = resolve_password(domain, username)?;
    let client = NfieldClient::new(config.session_config(password)?)?;

    info!(server = config.server(), "Running Nfield command");
    if let Some(response) = commands::execute(&client, &command).await? {
        commands::report(response)?;
    }

    Ok(())
}
