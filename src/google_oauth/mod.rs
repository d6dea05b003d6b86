//! Google OAuth plumbing: the token endpoint and the shared HTTP client.

pub mod endpoints;

use crate::config::GoogleConfig;
use crate::error::AgendaError;
use std::time::Duration;
use url::Url;

pub use endpoints::{GoogleOauthEndpoints, RefreshedToken};

/// What the token endpoint needs to run a refresh grant.
#[derive(Debug, Clone)]
pub struct OauthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: Url,
}

impl From<&GoogleConfig> for OauthSettings {
    fn from(cfg: &GoogleConfig) -> Self {
        Self {
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            token_uri: cfg.token_uri.clone(),
        }
    }
}

/// HTTP client shared by the token endpoint and the calendar gateway.
pub fn build_http_client(cfg: &GoogleConfig) -> Result<reqwest::Client, AgendaError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("practice-agenda/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        // token endpoint must not follow redirects
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}
