use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type AppointmentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "canceled" => Ok(AppointmentStatus::Canceled),
            other => Err(format!("unknown appointment status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub owner_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub status: AppointmentStatus,
    pub external_event_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub plan: Option<String>,
    pub standard_price: f64,
    pub charged_price: Option<f64>,
    pub discount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }
}

/// Fields the caller controls when a record is inserted or refreshed from
/// the calendar. Everything else is owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub owner_id: String,
    pub client_name: String,
    pub client_contact: String,
    pub external_event_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub standard_price: f64,
}

/// Billing detail written when an appointment is effectuated.
#[derive(Debug, Clone, PartialEq)]
pub struct Effectuation {
    pub plan: String,
    pub charged_price: f64,
    pub discount: f64,
}

/// Calendar access credential of one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct DbCredential {
    pub owner_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl DbCredential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}
