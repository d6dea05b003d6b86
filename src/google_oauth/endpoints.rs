use crate::error::AgendaError;
use crate::google_oauth::OauthSettings;

use oauth2::{
    AuthType, Client as OAuth2Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
    RefreshToken, StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use std::time::Duration;
use tracing::debug;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Result of a successful refresh-token grant.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Duration,
    /// Present only when the provider rotated the refresh token.
    pub refresh_token: Option<String>,
}

/// Stateless Google OAuth Endpoints.
pub struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Exchange a refresh token for a new access token. Single attempt; any
    /// failure surfaces as `CredentialRefresh`.
    pub async fn refresh_access_token(
        settings: &OauthSettings,
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<RefreshedToken, AgendaError> {
        let client = build_oauth2_client(settings);
        let token: BasicTokenResponse = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;

        let expires_in = token.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        debug!(expires_in_secs = expires_in.as_secs(), "Access token refreshed");
        Ok(RefreshedToken {
            access_token: token.access_token().secret().to_string(),
            expires_in,
            refresh_token: token.refresh_token().map(|t| t.secret().to_string()),
        })
    }
}

/// Build the OAuth2 client. Credentials go in the form body
/// (`client_id`, `client_secret`, `refresh_token`, `grant_type`).
fn build_oauth2_client(settings: &OauthSettings) -> GoogleOauth2Client {
    OAuth2Client::new(ClientId::new(settings.client_id.clone()))
        .set_client_secret(ClientSecret::new(settings.client_secret.clone()))
        .set_auth_type(AuthType::RequestBody)
        .set_token_uri(TokenUrl::from_url(settings.token_uri.clone()))
}

pub(super) type GoogleOauth2Client = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
