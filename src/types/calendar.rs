use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One event from the list-events call, reduced to what reconciliation reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalEvent {
    pub id: String,
    pub title: Option<String>,
    /// `None` for all-day events and events without a timed start.
    pub start: Option<DateTime<Utc>>,
    pub attendees: Vec<ExternalAttendee>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalAttendee {
    pub email: String,
    pub display_name: Option<String>,
}

/// Raw `events.list` page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsListResponse {
    #[serde(default)]
    pub items: Vec<GoogleEventRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GoogleEventRaw {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<EventDateTime>,
    #[serde(default)]
    pub attendees: Vec<AttendeeRaw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDateTime {
    #[serde(default)]
    pub date_time: Option<DateTime<chrono::FixedOffset>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AttendeeRaw {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<GoogleEventRaw> for ExternalEvent {
    fn from(raw: GoogleEventRaw) -> Self {
        ExternalEvent {
            id: raw.id,
            title: raw.summary.filter(|s| !s.trim().is_empty()),
            start: raw
                .start
                .and_then(|s| s.date_time)
                .map(|dt| dt.with_timezone(&Utc)),
            attendees: raw
                .attendees
                .into_iter()
                .map(|a| ExternalAttendee {
                    email: a.email,
                    display_name: a.display_name.filter(|n| !n.trim().is_empty()),
                })
                .collect(),
        }
    }
}

/// Body of the `events.patch` call used to mark an event completed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventSummaryPatch<'a> {
    pub summary: &'a str,
    pub color_id: &'a str,
}
