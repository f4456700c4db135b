//! Supabase (GoTrue) auth client.
//!
//! # Responsibilities
//! - Refresh sessions that are about to expire
//! - Resolve the user behind an access token
//! - Report cookie changes caused by refresh

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::json;

use crate::auth::session::{self, RequestCookies, Session};
use crate::auth::{AuthError, AuthProvider, AuthenticatedUser, Resolution};
use crate::config::AuthConfig;

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    cookie_name: String,
    refresh_margin_secs: u64,
}

impl SupabaseAuth {
    pub fn new(client: reqwest::Client, config: &AuthConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            cookie_name: config.cookie_name(),
            refresh_margin_secs: config.refresh_margin_secs,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// `GET /auth/v1/user`. `Ok(None)` when the token is not accepted.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<AuthenticatedUser>, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Access token not accepted");
            return Ok(None);
        }

        Ok(Some(response.json::<AuthenticatedUser>().await?))
    }

    /// `POST /auth/v1/token?grant_type=refresh_token`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::Rejected(status));
        }
        if !status.is_success() {
            return Err(AuthError::Unavailable(status));
        }

        let mut refreshed: Session = response.json().await?;
        if refreshed.expires_at.is_none() {
            refreshed.expires_at = refreshed.expires_in.map(|secs| now_unix() + secs);
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn resolve(&self, cookies: &RequestCookies) -> Resolution {
        let existing = session::session_cookie_names(cookies, &self.cookie_name);
        if existing.is_empty() {
            return Resolution::anonymous();
        }

        let mut current = match session::read_session(cookies, &self.cookie_name) {
            Some(Ok(s)) => s,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring unreadable session cookie");
                return Resolution::anonymous();
            }
            None => return Resolution::anonymous(),
        };

        let mut cookie_updates = Vec::new();

        if current.expires_within(self.refresh_margin_secs, now_unix()) {
            match self.refresh(&current.refresh_token).await {
                Ok(refreshed) => {
                    match session::write_session(&self.cookie_name, &refreshed, &existing) {
                        Ok(updates) => cookie_updates = updates,
                        Err(e) => tracing::warn!(error = %e, "Failed to encode refreshed session"),
                    }
                    tracing::debug!("Session refreshed");
                    current = refreshed;
                }
                Err(AuthError::Rejected(status)) => {
                    tracing::info!(status = %status, "Refresh token rejected, clearing session");
                    return Resolution {
                        user: None,
                        cookie_updates: session::clear_session(&existing),
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed");
                    return Resolution::anonymous();
                }
            }
        }

        if current.access_token.is_empty() {
            return Resolution {
                user: None,
                cookie_updates,
            };
        }

        let user = match self.get_user(&current.access_token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "User lookup failed");
                None
            }
        };

        Resolution { user, cookie_updates }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
