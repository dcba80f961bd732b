//! Copilot proxy-token authority.
//!
//! The completion API does not accept a GitHub session credential directly.
//! [`TokenAuthority`] exchanges the session's access token for a short-lived
//! Copilot token, caches it, and only goes back to the token endpoint once
//! the cached token is within [`TOKEN_REFRESH_BUFFER_MS`] of expiry.
//!
//! The identity session itself comes from the host through the
//! [`SessionProvider`] seam, so the authority never manages GitHub sign-in
//! state on its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::guards::{to_number, to_str};
use crate::secret::{ExposeSecret, SecretString};

/// Refresh this long before the token's stated expiry.
pub const TOKEN_REFRESH_BUFFER_MS: i64 = 60_000;
/// Lifetime assumed when the token response carries no expiry hint.
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 5 * 60 * 1000;

/// A signed-in GitHub identity as reported by the host.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub access_token: SecretString,
    /// Display label for the account (usually the GitHub login).
    pub account_label: String,
}

/// Host-provided access to the GitHub identity session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Return the current session. With `interactive` set the host may
    /// prompt the user to sign in; `Ok(None)` means no session is available.
    async fn get_session(&self, interactive: bool) -> Result<Option<IdentitySession>>;
}

struct CachedToken {
    token: SecretString,
    expires_at_ms: i64,
}

/// Owns the cached Copilot token for one panel.
///
/// Refresh holds the cache lock across the exchange, so callers that find
/// the token stale at the same time wait for a single exchange instead of
/// each performing their own.
pub struct TokenAuthority {
    http: reqwest::Client,
    token_url: String,
    headers: Vec<(String, String)>,
    sessions: Arc<dyn SessionProvider>,
    inner: Mutex<Option<CachedToken>>,
}

impl TokenAuthority {
    pub fn new(http: reqwest::Client, config: &Config, sessions: Arc<dyn SessionProvider>) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            headers: config.headers.clone(),
            sessions,
            inner: Mutex::new(None),
        }
    }

    /// Query the host for the identity session without touching the cache.
    pub async fn get_session(&self, interactive: bool) -> Result<Option<IdentitySession>> {
        self.sessions.get_session(interactive).await
    }

    /// Return a usable Copilot token, exchanging a fresh one when needed.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> Result<String> {
        let mut guard = self.inner.lock().await;

        if let Some(entry) = guard.as_ref() {
            if is_fresh(entry.expires_at_ms, now_ms()) {
                debug!("Using cached Copilot token");
                return Ok(entry.token.expose_secret().to_string());
            }
            debug!(expires_at_ms = entry.expires_at_ms, "Cached Copilot token is stale");
        }

        let session = self
            .sessions
            .get_session(true)
            .await?
            .ok_or(ChatError::AuthenticationCanceled)?;

        let data = self.exchange(&session).await?;
        let token = to_str(data.get("token"))
            .filter(|t| !t.is_empty())
            .ok_or(ChatError::MalformedTokenResponse)?
            .to_string();
        let expires_at_ms = parse_token_expiry(&data, now_ms());

        info!(expires_at_ms, "Exchanged GitHub session for Copilot token");
        *guard = Some(CachedToken {
            token: SecretString::new(token.clone()),
            expires_at_ms,
        });
        Ok(token)
    }

    /// Expiry of the cached token in ms since the epoch, if one is cached.
    pub async fn expires_at_ms(&self) -> Option<i64> {
        self.inner.lock().await.as_ref().map(|e| e.expires_at_ms)
    }

    async fn exchange(&self, session: &IdentitySession) -> Result<Value> {
        let mut builder = self.http.get(&self.token_url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let resp = builder
            .header(
                "Authorization",
                format!("token {}", session.access_token.expose_secret()),
            )
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Copilot token request rejected");
            return Err(ChatError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| {
            warn!(error = %err, "Copilot token response is not JSON");
            ChatError::MalformedTokenResponse
        })
    }
}

/// Work out the absolute expiry (ms since epoch) of a token response.
///
/// Preference order: numeric `expires_at` (seconds), date-string
/// `expires_at`, numeric `refresh_in` (seconds from `now_ms`), then a
/// five-minute default.
pub fn parse_token_expiry(data: &Value, now_ms: i64) -> i64 {
    let expires_at = data.get("expires_at");

    if let Some(secs) = to_number(expires_at) {
        return (secs * 1000.0) as i64;
    }

    if let Some(parsed) = to_str(expires_at).and_then(parse_date_ms) {
        return parsed;
    }

    if let Some(secs) = to_number(data.get("refresh_in")) {
        return now_ms.saturating_add((secs * 1000.0) as i64);
    }

    now_ms.saturating_add(DEFAULT_TOKEN_LIFETIME_MS)
}

/// A cached token is usable until [`TOKEN_REFRESH_BUFFER_MS`] before expiry.
fn is_fresh(expires_at_ms: i64, now_ms: i64) -> bool {
    now_ms < expires_at_ms.saturating_sub(TOKEN_REFRESH_BUFFER_MS)
}

fn parse_date_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
