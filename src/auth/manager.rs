use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use log::{info, warn};

use crate::auth::credentials::{CredentialStore, Credentials};
use crate::auth::oauth::{GMAIL_MODIFY_SCOPE, OAuthClient, Tokens};
use crate::mail::error::MailError;
use crate::mail::transport::{AccessToken, HttpTransport, MailTransport};
use crate::session::Authorizer;

/// Lifetime assumed when the token endpoint does not report one.
const DEFAULT_LIFETIME_SECS: i64 = 3500;

/// True when the token could not be obtained only because the endpoint was
/// unreachable; the stored credentials may still be good.
pub fn is_transient(e: &anyhow::Error) -> bool {
    e.downcast_ref::<MailError>()
        .is_some_and(MailError::is_transient)
}

#[derive(Debug, Clone)]
pub struct TokenManager {
    oauth: OAuthClient,
    store: CredentialStore,
    identity: String,
}

impl TokenManager {
    pub fn new(oauth: OAuthClient, store: CredentialStore, identity: impl Into<String>) -> Self {
        Self {
            oauth,
            store,
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns a valid access token: the cached one, else a refreshed one.
    /// Only when `interactive` is set does it fall back to the browser flow;
    /// `cancelled` aborts that flow.
    pub fn access_token_with(&self, interactive: bool, cancelled: &dyn Fn() -> bool) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        let cached = self.store.load(&self.identity)?.unwrap_or_default();

        if let Some(at) = cached.valid_access_token(now) {
            return Ok(at.to_string());
        }

        if let Some(rt) = cached.refresh_token.as_deref() {
            match self.oauth.refresh(rt) {
                Ok(t) => {
                    info!("refreshed access token for {}", self.identity);
                    return self.remember(cached, t, now);
                }
                Err(e) if is_transient(&e) => return Err(e),
                Err(e) => warn!("refresh failed for {}: {e:#}", self.identity),
            }
        }

        if !interactive {
            return Err(anyhow!(
                "no valid credentials for identity '{}'; restart to authorize",
                self.identity
            ));
        }

        info!("running interactive authorization for {}", self.identity);
        let t = self.oauth.authorize(GMAIL_MODIFY_SCOPE, cancelled)?;
        self.remember(cached, t, now)
    }

    fn remember(&self, previous: Credentials, t: Tokens, now: i64) -> Result<String> {
        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + DEFAULT_LIFETIME_SECS);
        let creds = Credentials {
            access_token: Some(t.access_token.clone()),
            expires_at_epoch: Some(exp),
            // Google omits the refresh token on refresh responses
            refresh_token: t.refresh_token.or(previous.refresh_token),
        };
        self.store.save(&self.identity, &creds)?;
        Ok(t.access_token)
    }
}

impl AccessToken for TokenManager {
    fn access_token(&self) -> Result<String> {
        self.access_token_with(false, &|| false)
    }
}

/// Builds an HTTP transport for each bootstrap. Never prompts: the terminal
/// is owned by the session by the time this runs. An unreachable token
/// endpoint is left to the connect loop, which retries it.
pub struct HttpAuthorizer {
    tokens: TokenManager,
    timeout: Option<Duration>,
}

impl HttpAuthorizer {
    pub fn new(tokens: TokenManager, timeout: Option<Duration>) -> Self {
        Self { tokens, timeout }
    }
}

impl Authorizer for HttpAuthorizer {
    fn authorize(&mut self) -> Result<Box<dyn MailTransport>> {
        if let Err(e) = self.tokens.access_token()
            && !is_transient(&e)
        {
            return Err(e);
        }
        let transport = HttpTransport::new(Box::new(self.tokens.clone()), self.timeout)?;
        Ok(Box::new(transport))
    }
}
