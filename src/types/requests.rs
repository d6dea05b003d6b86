use crate::db::{AppointmentId, AppointmentStatus};
use crate::error::AgendaError;
use crate::service::metrics::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Success envelope shared by every `/api` response.
#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiOk<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Fields are optional so a missing one is reported as `INVALID_INPUT` with
/// the field name rather than as a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectuateRequest {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default, alias = "charged_price")]
    pub charged_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct EffectuateResponse {
    pub discount: f64,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub expiry: DateTime<Utc>,
    pub has_refresh_token: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub client_name: String,
    #[serde(default)]
    pub client_contact: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub standard_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<AppointmentStatus>,
    pub period: Option<Period>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub months: Option<u32>,
}

/// `/owners/{owner_id}/appointments/{appointment_id}`. The id stays a string
/// here so a malformed one is reported against its own field.
#[derive(Debug, Deserialize)]
pub struct AppointmentPath {
    pub owner_id: String,
    appointment_id: String,
}

impl AppointmentPath {
    pub fn appointment_id(&self) -> Result<AppointmentId, AgendaError> {
        Uuid::parse_str(self.appointment_id.trim())
            .map_err(|_| AgendaError::invalid("appointment_id", "must be a UUID"))
    }
}
