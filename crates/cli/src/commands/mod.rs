//! CLI command implementations.

pub mod config;
pub mod products;
pub mod seed;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use vitrina_admin::backend::{MemoryBackend, RestBackend};
use vitrina_admin::config::{BackendConfig, admin_email_from_env};
use vitrina_admin::state::AppState;
use vitrina_core::Email;

/// Admin account used by `--memory` when `VITRINA_ADMIN_EMAIL` is unset.
const MEMORY_ADMIN_EMAIL: &str = "admin@vitrina.local";

/// Password of the in-memory admin when `VITRINA_ADMIN_PASSWORD` is unset.
const MEMORY_ADMIN_PASSWORD: &str = "memory";

/// Build services against the hosted backend, or an empty in-memory one.
///
/// # Errors
///
/// Returns an error if configuration is missing or the client cannot be built.
pub fn connect(memory: bool) -> Result<AppState, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    if memory {
        let admin_email = match admin_email_from_env() {
            Ok(email) => email,
            Err(_) => Email::parse(MEMORY_ADMIN_EMAIL)?,
        };
        let password = admin_password(true)?;
        let backend = MemoryBackend::default().with_user(
            admin_email.as_str(),
            password.expose_secret(),
            true,
        );
        info!(admin = %admin_email, "Using in-memory backend");
        return Ok(AppState::from_backend(Arc::new(backend), admin_email));
    }

    let config = BackendConfig::from_env()?;
    let admin_email = admin_email_from_env()?;
    let backend = RestBackend::new(&config)?;
    info!(url = %config.url, "Connected to backend");
    Ok(AppState::from_backend(Arc::new(backend), admin_email))
}

/// Sign in as the configured admin before writing.
///
/// # Errors
///
/// Returns an error if no password is available or the gate refuses the
/// sign-in.
pub async fn sign_in_admin(state: &AppState, memory: bool) -> Result<(), Box<dyn std::error::Error>> {
    let password = admin_password(memory)?;
    let email = state.gate().admin_email().as_str().to_owned();
    state.gate().sign_in(&email, password.expose_secret()).await?;
    info!(admin = %email, "Signed in");
    Ok(())
}

fn admin_password(memory: bool) -> Result<SecretString, Box<dyn std::error::Error>> {
    match std::env::var("VITRINA_ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => Ok(SecretString::from(password)),
        _ if memory => Ok(SecretString::from(MEMORY_ADMIN_PASSWORD)),
        _ => Err("VITRINA_ADMIN_PASSWORD not set".into()),
    }
}
