use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};
use log::warn;

const SERVICE: &str = "tegmail";

/// Environment fallback when the keyring holds no secret.
pub const CLIENT_SECRET_ENV: &str = "OAUTH_CLIENT_SECRET";

/// Save a client secret into the keyring, keyed by client_id
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, client_id)?;
    entry
        .set_password(client_secret)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load client secret from keyring by client_id
pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, client_id)?;
    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Keyring first, then `OAUTH_CLIENT_SECRET`. An unavailable keyring is not
/// fatal; installed-app clients may run without a secret.
pub fn resolve_client_secret(client_id: &str) -> Option<String> {
    let stored = load_client_secret(client_id).unwrap_or_else(|e| {
        warn!("keyring unavailable: {e}");
        None
    });
    stored.or_else(|| {
        std::env::var(CLIENT_SECRET_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
    })
}
