use anyhow::{Result, anyhow};
use log::{info, warn};
use oauth2::TokenResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, RequestTokenError, Scope, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

use crate::mail::error::MailError;

/// Read, label and trash; no permanent deletion.
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Tokens returned by the oauth flow (in-memory)
#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    open_browser: bool,
}

impl OAuthClient {
    pub fn new(client_id: &str, client_secret: Option<String>, redirect_uri: &str) -> Result<Self> {
        Url::parse(redirect_uri).map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret,
            redirect_uri: redirect_uri.to_string(),
            open_browser: true,
        })
    }

    /// When false the authorization URL is only printed.
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    fn client(&self) -> Result<BasicClient> {
        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            self.client_secret.clone().map(ClientSecret::new),
            AuthUrl::new(AUTH_URL.to_string())?,
            Some(TokenUrl::new(TOKEN_URL.to_string())?),
        ))
    }

    /// Exchange a refresh token for a new access token. Failing to reach the
    /// token endpoint is reported as `MailError::Connection`.
    pub fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let rt = RefreshToken::new(refresh_token.to_string());
        let token = self
            .client()?
            .exchange_refresh_token(&rt)
            .request(http_client)
            .map_err(|e| match e {
                RequestTokenError::Request(inner) => {
                    anyhow::Error::new(MailError::Connection(format!("token endpoint: {inner}")))
                }
                other => anyhow!("token refresh failed: {other}"),
            })?;

        Ok(Tokens {
            access_token: token.access_token().secret().to_string(),
            refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
            expires_in: token.expires_in().map(|d| d.as_secs()),
        })
    }

    /// Authorization Code + PKCE flow. Prints the consent URL (and opens it
    /// unless disabled), then waits on a loopback listener for the redirect.
    /// `cancelled` is polled while waiting.
    pub fn authorize(&self, scope: &str, cancelled: &dyn Fn() -> bool) -> Result<Tokens> {
        let (host, bind_addr) = callback_addr(&self.redirect_uri)?;

        // listen before the browser can redirect
        let server = Server::http(bind_addr)
            .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

        let oauth_client = self
            .client()?
            .set_redirect_uri(RedirectUrl::new(self.redirect_uri.clone())?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(scope.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        eprintln!("Open this URL in your browser:\n{auth_url}");
        if self.open_browser
            && let Err(e) = open::that(auth_url.as_str())
        {
            eprintln!("Warning: could not open browser automatically: {e}");
        }

        let mut code = None;
        let wait_until = Instant::now() + CALLBACK_TIMEOUT;
        while code.is_none() && Instant::now() < wait_until {
            if cancelled() {
                return Err(anyhow!("authorization cancelled"));
            }
            let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(500)) else {
                continue;
            };
            let full = format!("http://{host}:{}{}", bind_addr.port(), request.url());
            let reply = match callback_code(&full, csrf.secret()) {
                Ok(Some(c)) => {
                    code = Some(c);
                    "Authorization received. You can close this tab."
                }
                Ok(None) => "No code found in redirect. You can close this tab.",
                Err(CallbackError::Denied(reason)) => {
                    let _ = request.respond(Response::from_string(
                        "Authorization was denied. You can close this tab.",
                    ));
                    return Err(anyhow!("authorization denied: {reason}"));
                }
                Err(e) => {
                    warn!("rejected oauth callback: {e}");
                    "Bad redirect"
                }
            };
            let _ = request.respond(Response::from_string(reply));
        }

        let code = code.ok_or_else(|| anyhow!("No code received within timeout"))?;

        let token = oauth_client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request(http_client)
            .map_err(|e| anyhow!("Token exchange failed: {e}"))?;
        info!("authorization code exchanged");

        Ok(Tokens {
            access_token: token.access_token().secret().to_string(),
            refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
            expires_in: token.expires_in().map(|d| d.as_secs()),
        })
    }
}

/// Host name and loopback socket to listen on for `redirect_uri`.
fn callback_addr(redirect_uri: &str) -> Result<(String, SocketAddr)> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;
    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect_uri}"))?;
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect_uri}"))?;

    let bind_ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };
    Ok((host.to_string(), SocketAddr::new(bind_ip, port)))
}

#[derive(Debug, thiserror::Error)]
enum CallbackError {
    /// The user declined consent; no code will follow.
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("state mismatch in oauth callback")]
    StateMismatch,
    #[error("unparseable callback url: {0}")]
    BadUrl(#[from] url::ParseError),
}

/// The authorization code carried by a redirect, after checking `state`.
/// `Ok(None)` for requests without a code (favicon and the like).
fn callback_code(url: &str, expected_state: &str) -> Result<Option<String>, CallbackError> {
    let parsed = Url::parse(url)?;
    let mut code = None;
    let mut state = None;
    for (k, v) in parsed.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => return Err(CallbackError::Denied(v.into_owned())),
            _ => {}
        }
    }
    match code {
        Some(_) if state.as_deref() != Some(expected_state) => Err(CallbackError::StateMismatch),
        other => Ok(other),
    }
}
