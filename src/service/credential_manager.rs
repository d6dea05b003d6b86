use crate::db::{CredentialsStorage, DbCredential};
use crate::error::AgendaError;
use crate::google_oauth::{GoogleOauthEndpoints, OauthSettings};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tracing::{info, warn};

/// Lifetime assumed for a sign-in token when the caller does not say.
pub const DEFAULT_SIGN_IN_LIFETIME: Duration = Duration::from_secs(3600);

/// Longest token lifetime accepted at sign-in; refresh responses are capped to it.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 3600);

/// Hands out a usable access token per owner, refreshing it through the
/// token endpoint when the stored one has expired.
#[derive(Clone)]
pub struct CredentialManager {
    storage: CredentialsStorage,
    oauth: OauthSettings,
    http: reqwest::Client,
}

impl CredentialManager {
    pub fn new(storage: CredentialsStorage, oauth: OauthSettings, http: reqwest::Client) -> Self {
        Self {
            storage,
            oauth,
            http,
        }
    }

    /// Return a non-expired access token for `owner_id`.
    ///
    /// An expired token with a refresh token triggers exactly one refresh call;
    /// without a refresh token the caller gets `CredentialExpired` and must
    /// sign in again.
    pub async fn valid_access_token(&self, owner_id: &str) -> Result<String, AgendaError> {
        let cred = self
            .storage
            .get_by_owner(owner_id)
            .await?
            .ok_or(AgendaError::CredentialMissing)?;

        let now = Utc::now();
        if !cred.is_expired_at(now) {
            return Ok(cred.access_token);
        }

        let Some(refresh_token) = cred.refresh_token.as_deref() else {
            warn!(owner_id, expiry = %cred.expiry, "Access token expired and no refresh token stored");
            return Err(AgendaError::CredentialExpired);
        };

        let refreshed =
            GoogleOauthEndpoints::refresh_access_token(&self.oauth, refresh_token, &self.http)
                .await
                .inspect_err(|e| warn!(owner_id, error = %e, "Access token refresh failed"))?;

        if refreshed.expires_in > MAX_TOKEN_LIFETIME {
            warn!(
                owner_id,
                expires_in_secs = refreshed.expires_in.as_secs(),
                "Token endpoint reported an oversized lifetime; capping"
            );
        }
        let expiry = expiry_after(now, refreshed.expires_in.min(MAX_TOKEN_LIFETIME))?;
        if let Err(e) = self
            .storage
            .update_access_token(
                owner_id,
                &refreshed.access_token,
                expiry,
                refreshed.refresh_token.as_deref(),
                now,
            )
            .await
        {
            warn!(owner_id, error = %e, "Refreshed token could not be persisted");
        } else {
            info!(owner_id, expiry = %expiry, "Access token refreshed and stored");
        }

        Ok(refreshed.access_token)
    }

    /// Store the tokens handed over at sign-in, replacing any previous credential.
    pub async fn store_sign_in(
        &self,
        owner_id: &str,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<Duration>,
    ) -> Result<DbCredential, AgendaError> {
        if access_token.trim().is_empty() {
            return Err(AgendaError::invalid("access_token", "must not be empty"));
        }
        let lifetime = expires_in.unwrap_or(DEFAULT_SIGN_IN_LIFETIME);
        if lifetime > MAX_TOKEN_LIFETIME {
            return Err(AgendaError::invalid(
                "expires_in",
                format!("must not exceed {} seconds", MAX_TOKEN_LIFETIME.as_secs()),
            ));
        }
        let now = Utc::now();
        let cred = DbCredential {
            owner_id: owner_id.to_string(),
            access_token,
            refresh_token: refresh_token.filter(|t| !t.trim().is_empty()),
            expiry: expiry_after(now, lifetime)?,
        };
        self.storage.upsert(&cred, now).await?;
        info!(owner_id, has_refresh = cred.refresh_token.is_some(), "Credential stored");
        Ok(cred)
    }
}

fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>, AgendaError> {
    TimeDelta::from_std(lifetime)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| AgendaError::invalid("expires_in", "token lifetime out of range"))
}
