//! OAuth2 client-credentials tokens from Microsoft Entra ID.
//!
//! Tokens are cached and refreshed shortly before they expire.

use std::time::{Duration, Instant};

use azsite_core::Credentials;
use azsite_core::credentials::{CLIENT_ID_VAR, CLIENT_SECRET_VAR, TENANT_ID_VAR};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ArmError, ArmResult};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope granting access to the ARM management plane.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Refresh a cached token this long before it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Longest lifetime trusted from `expires_in`; Entra ID issues at most a day.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_MARGIN
    }
}

/// Service principal token source.
#[derive(Debug)]
pub struct TokenProvider {
    http: Client,
    authority: String,
    scope: String,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, credentials: &Credentials) -> Self {
        Self {
            http,
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: MANAGEMENT_SCOPE.to_string(),
            tenant_id: credentials.tenant_id.clone(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            cache: Mutex::new(None),
        }
    }

    /// Use a different Entra ID authority host (sovereign clouds, tests).
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// A bearer token for the management scope, from cache when still fresh.
    pub async fn token(&self) -> ArmResult<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.access_token.clone());
        }

        let fresh = self.request_token().await?;
        let token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> ArmResult<CachedToken> {
        let tenant_id = require(&self.tenant_id, TENANT_ID_VAR)?;
        let client_id = require(&self.client_id, CLIENT_ID_VAR)?;
        let client_secret = require(&self.client_secret, CLIENT_SECRET_VAR)?;

        let url = format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/')
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", self.scope.as_str()),
        ];

        let requested_at = Instant::now();
        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_err!(Transport))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, tenant = tenant_id, "token request rejected");
            return Err(ArmError::Auth {
                status: status.as_u16(),
                message: token_error_message(&body),
            });
        }

        let body: TokenResponse = response.json().await.map_err(map_err!(Decode))?;
        debug!(expires_in = body.expires_in, "access token acquired");
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: expiry(requested_at, body.expires_in),
        })
    }
}

/// When a token issued at `requested_at` stops being usable. A lifetime that
/// cannot be represented leaves the token uncached.
fn expiry(requested_at: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in).min(MAX_TOKEN_LIFETIME);
    requested_at.checked_add(lifetime).unwrap_or(requested_at)
}

fn require<'a>(value: &'a Option<String>, var: &'static str) -> ArmResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ArmError::MissingCredential(var))
}

fn token_error_message(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => match err.error_description {
            Some(description) => format!("{}: {description}", err.error),
            None => err.error,
        },
        Err(_) => body.to_string(),
    }
}
