//! Client-credentials token acquisition
//!
//! The harvester runs unattended as an application identity (tenant, client
//! id, client secret), so there is no interactive flow: tokens come straight
//! from the tenant's token endpoint and are cached in memory until close to
//! expiry.

use chrono::Utc;
use log::debug;
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::config::GraphCredentials;
use crate::error::{SyncError, SyncResult};
use crate::mailbox::CredentialProvider;

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Token endpoint error body
#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    error_description: Option<String>,
}

struct CachedToken {
    access_token: String,
    /// Unix seconds
    expires_at: i64,
}

/// Access tokens for Graph via the OAuth2 client-credentials grant
pub struct ClientCredentialsAuth {
    credentials: GraphCredentials,
    agent: ureq::Agent,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsAuth {
    const TOKEN_URL_BASE: &'static str = "https://login.microsoftonline.com";
    const GRAPH_SCOPE: &'static str = "https://graph.microsoft.com/.default";

    /// Tokens within this many seconds of expiry are refreshed
    const EXPIRY_BUFFER_SECS: i64 = 300;

    pub fn new(credentials: GraphCredentials) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            credentials,
            agent,
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            Self::TOKEN_URL_BASE,
            urlencoding::encode(&self.credentials.tenant_id)
        )
    }

    fn fetch_token(&self) -> SyncResult<TokenResponse> {
        let mut response = self
            .agent
            .post(&self.token_url())
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", Self::GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .map_err(|e| SyncError::auth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string().unwrap_or_default();
            let message = match serde_json::from_str::<TokenError>(&body) {
                Ok(err) => format!(
                    "{} ({})",
                    err.error,
                    err.error_description.unwrap_or_default()
                ),
                Err(_) => format!("HTTP {}", status),
            };
            return Err(SyncError::auth(message));
        }

        response
            .body_mut()
            .read_json::<TokenResponse>()
            .map_err(|e| SyncError::auth(format!("Failed to parse token response: {}", e)))
    }
}

impl CredentialProvider for ClientCredentialsAuth {
    fn access_token(&self) -> SyncResult<String> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref()
            && token.expires_at > now + Self::EXPIRY_BUFFER_SECS
        {
            return Ok(token.access_token.clone());
        }

        debug!("Requesting access token for tenant {}", self.credentials.tenant_id);
        let fresh = self.fetch_token()?;
        let access_token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            expires_at: now + fresh.expires_in.unwrap_or(3600),
        });
        Ok(access_token)
    }
}
