use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default Google endpoints; both can be overridden so tests can point at a mock server.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "AGENDA_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub google: GoogleConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Shared secret every `/api` request must present. No default; startup
    /// fails while it is empty.
    pub api_key: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:agenda.db".to_string(),
            loglevel: "info".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: Url,
    pub calendar_api_base: Url,
    pub calendar_id: String,
    pub max_results: u32,
    /// Extra attempts for the list-events call on transport errors and 5xx.
    pub list_retry_times: usize,
    pub proxy: Option<Url>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_uri: Url::parse(GOOGLE_TOKEN_URI).expect("valid default token uri"),
            calendar_api_base: Url::parse(GOOGLE_CALENDAR_API_BASE)
                .expect("valid default calendar api base"),
            calendar_id: "primary".to_string(),
            max_results: 100,
            list_retry_times: 2,
            proxy: None,
            connect_timeout_secs: 5,
            timeout_secs: 15,
        }
    }
}

/// How a completed appointment is mirrored onto the external calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMirror {
    /// Retitle and recolor the event, leaving it visible.
    Patch,
    /// Remove the event from the calendar.
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub default_standard_price: f64,
    pub completion_mirror: CompletionMirror,
    pub completed_title_prefix: String,
    pub completed_color_id: String,
    pub monthly_goal: u32,
    pub report_months: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_standard_price: 150.0,
            completion_mirror: CompletionMirror::Patch,
            completed_title_prefix: "✔ Completed".to_string(),
            completed_color_id: "10".to_string(),
            monthly_goal: 25,
            report_months: 6,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml` if present, then `AGENDA_*` env vars
    /// (`AGENDA_GOOGLE__CLIENT_ID` -> `google.client_id`).
    pub fn load() -> Result<Self, figment::Error> {
        let cfg: Config = Self::figment().extract()?;
        if cfg.basic.api_key.trim().is_empty() {
            return Err(figment::Error::from(format!(
                "basic.api_key is not set; configure it in {CONFIG_FILE} or {ENV_PREFIX}BASIC__API_KEY"
            )));
        }
        Ok(cfg)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
