//! Pure reconciliation planning: given the owner's scheduled appointments and
//! a fresh page of calendar events, decide what to upsert and what to delete.
//! No I/O happens here; `sync` applies the plan.

use crate::db::{Appointment, AppointmentDraft, AppointmentId};
use crate::types::calendar::ExternalEvent;
use std::collections::HashSet;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconciliationPlan {
    /// One draft per billable event, in fetch order.
    pub upserts: Vec<AppointmentDraft>,
    /// Scheduled, calendar-linked appointments whose event is gone.
    pub orphans: Vec<AppointmentId>,
    /// Events without a title or a timed start.
    pub skipped: usize,
}

/// Map one event to the record it should produce, or `None` when it cannot
/// stand for a billable appointment.
pub fn draft_from_event(
    owner_id: &str,
    event: &ExternalEvent,
    standard_price: f64,
) -> Option<AppointmentDraft> {
    let title = event.title.as_deref()?;
    let start = event.start?;
    let first = event.attendees.first();

    let client_name = first
        .and_then(|a| a.display_name.clone())
        .unwrap_or_else(|| title.to_string());
    let client_contact = first.map(|a| a.email.clone()).unwrap_or_default();

    Some(AppointmentDraft {
        owner_id: owner_id.to_string(),
        client_name,
        client_contact,
        external_event_id: Some(event.id.clone()),
        scheduled_at: Some(start),
        standard_price,
    })
}

/// Build the plan. Orphans are checked against every fetched id, including
/// skipped events, since those still exist on the calendar. Local records
/// without an external id and records that are not scheduled are never
/// orphans.
pub fn plan_reconciliation(
    owner_id: &str,
    local_scheduled: &[Appointment],
    fetched: &[ExternalEvent],
    standard_price: f64,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();

    for event in fetched {
        match draft_from_event(owner_id, event, standard_price) {
            Some(draft) => plan.upserts.push(draft),
            None => plan.skipped += 1,
        }
    }

    let fetched_ids: HashSet<&str> = fetched.iter().map(|e| e.id.as_str()).collect();
    plan.orphans = local_scheduled
        .iter()
        .filter(|a| a.owner_id == owner_id && a.is_scheduled())
        .filter(|a| {
            a.external_event_id
                .as_deref()
                .is_some_and(|ext| !fetched_ids.contains(ext))
        })
        .map(|a| a.id)
        .collect();

    plan
}
