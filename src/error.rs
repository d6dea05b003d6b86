use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AgendaError {
    #[error("No calendar credential stored for this owner; sign in first")]
    CredentialMissing,

    #[error("Calendar credential expired and cannot be refreshed; sign in again")]
    CredentialExpired,

    #[error("Calendar credential refresh failed: {0}")]
    CredentialRefresh(String),

    #[error("Calendar API error ({status}): {message}")]
    Gateway { status: StatusCode, message: String },

    #[error("Calendar sync failed: {0}")]
    SyncFailed(Box<AgendaError>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },

    #[error("Appointment is not scheduled")]
    NotScheduled,

    #[error("Database error: {0}")]
    Persistence(#[from] SqlxError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgendaError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AgendaError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// Transport failures and upstream 5xx/429 are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgendaError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AgendaError::Gateway { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Short machine-checkable kind carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AgendaError::CredentialMissing => "CREDENTIAL_MISSING",
            AgendaError::CredentialExpired => "CREDENTIAL_EXPIRED",
            AgendaError::CredentialRefresh(_) => "CREDENTIAL_REFRESH_FAILED",
            AgendaError::Gateway { .. } | AgendaError::Reqwest(_) | AgendaError::UrlParse(_) => {
                "GATEWAY_ERROR"
            }
            AgendaError::SyncFailed(_) => "SYNC_FAILED",
            AgendaError::NotFound(_) => "NOT_FOUND",
            AgendaError::InvalidInput { .. } => "INVALID_INPUT",
            AgendaError::NotScheduled => "NOT_SCHEDULED",
            AgendaError::Persistence(_) => "PERSISTENCE_ERROR",
            AgendaError::Json(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AgendaError::CredentialMissing
            | AgendaError::CredentialExpired
            | AgendaError::CredentialRefresh(_) => StatusCode::UNAUTHORIZED,
            AgendaError::Gateway { .. }
            | AgendaError::SyncFailed(_)
            | AgendaError::Reqwest(_)
            | AgendaError::UrlParse(_) => StatusCode::BAD_GATEWAY,
            AgendaError::NotFound(_) => StatusCode::NOT_FOUND,
            AgendaError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AgendaError::NotScheduled => StatusCode::CONFLICT,
            AgendaError::Persistence(_) | AgendaError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn display_message(&self) -> String {
        match self {
            AgendaError::Persistence(_) => {
                "The operation did not complete; nothing was changed.".to_string()
            }
            AgendaError::Json(_) => "An internal server error occurred.".to_string(),
            AgendaError::SyncFailed(inner) => format!("Calendar sync failed: {inner}"),
            other => other.to_string(),
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for AgendaError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => {
                AgendaError::CredentialRefresh(format!("token endpoint rejected refresh: {}", err.error()))
            }
            RequestTokenError::Request(req_e) => {
                AgendaError::CredentialRefresh(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                AgendaError::CredentialRefresh(format!("unreadable token response: {}", parse_err))
            }
            RequestTokenError::Other(s) => AgendaError::CredentialRefresh(s),
        }
    }
}

/// Request fields a rejection can be attributed to.
const REQUEST_FIELDS: &[&str] = &[
    "plan",
    "chargedPrice",
    "charged_price",
    "access_token",
    "refresh_token",
    "expires_in",
    "client_name",
    "client_contact",
    "scheduled_at",
    "standard_price",
    "status",
    "period",
    "month",
    "months",
];

/// Pull the offending field out of an extractor message, either the
/// `<field>: <reason>` form or serde's "missing field" form.
fn rejected_field(body_text: &str) -> Option<&'static str> {
    let detail = body_text.split_once(": ").map_or(body_text, |(_, d)| d);
    let candidate = match detail.split_once("missing field `") {
        Some((_, rest)) => rest.split('`').next().unwrap_or_default(),
        None => detail.split_once(": ").map_or("", |(field, _)| field),
    };
    REQUEST_FIELDS.iter().copied().find(|f| *f == candidate)
}

impl From<JsonRejection> for AgendaError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        let field = match &rejection {
            JsonRejection::JsonDataError(_) => rejected_field(&message).unwrap_or("body"),
            _ => "body",
        };
        AgendaError::InvalidInput { field, message }
    }
}

impl From<QueryRejection> for AgendaError {
    fn from(rejection: QueryRejection) -> Self {
        let message = rejection.body_text();
        let field = rejected_field(&message).unwrap_or("query");
        AgendaError::InvalidInput { field, message }
    }
}

impl From<PathRejection> for AgendaError {
    fn from(rejection: PathRejection) -> Self {
        AgendaError::invalid("path", rejection.body_text())
    }
}

impl IntoResponse for AgendaError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let field = match &self {
            AgendaError::InvalidInput { field, .. } => Some(*field),
            _ => None,
        };
        let body = ApiErrorBody {
            code: self.code(),
            message: self.display_message(),
            field,
        };
        (
            status,
            Json(ApiErrorResponse {
                success: false,
                error: body,
            }),
        )
            .into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}
