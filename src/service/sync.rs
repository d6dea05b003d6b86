use crate::api::calendar_api::CalendarGateway;
use crate::db::AppointmentsStorage;
use crate::error::AgendaError;
use crate::service::credential_manager::CredentialManager;
use crate::service::reconcile::plan_reconciliation;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Events upserted successfully.
    pub processed: usize,
    /// Orphaned appointments deleted.
    pub removed: usize,
    /// Events ignored for lacking a title or a timed start.
    pub skipped: usize,
}

/// Aligns an owner's scheduled appointments with their upcoming calendar events.
#[derive(Clone)]
pub struct SyncService {
    credentials: CredentialManager,
    gateway: CalendarGateway,
    appointments: AppointmentsStorage,
    standard_price: f64,
}

impl SyncService {
    pub fn new(
        credentials: CredentialManager,
        gateway: CalendarGateway,
        appointments: AppointmentsStorage,
        standard_price: f64,
    ) -> Self {
        Self {
            credentials,
            gateway,
            appointments,
            standard_price,
        }
    }

    /// Credential errors propagate unchanged and a failed fetch aborts with
    /// `SyncFailed`; both happen before any write. Individual upsert/delete
    /// failures are logged and skipped.
    pub async fn sync(&self, owner_id: &str) -> Result<SyncSummary, AgendaError> {
        let token = self.credentials.valid_access_token(owner_id).await?;

        let now = Utc::now();
        let events = self
            .gateway
            .list_upcoming_events(&token, now)
            .await
            .map_err(|e| {
                warn!(owner_id, error = %e, "Calendar fetch failed; sync aborted");
                AgendaError::SyncFailed(Box::new(e))
            })?;

        let local_scheduled = self.appointments.list_scheduled_by_owner(owner_id).await?;
        let plan = plan_reconciliation(owner_id, &local_scheduled, &events, self.standard_price);

        let mut summary = SyncSummary {
            skipped: plan.skipped,
            ..SyncSummary::default()
        };

        for draft in plan.upserts {
            let event_id = draft.external_event_id.clone().unwrap_or_default();
            match self.appointments.upsert_by_external_id(draft, now).await {
                Ok(_) => summary.processed += 1,
                Err(e) => warn!(owner_id, event_id = %event_id, error = %e, "Upsert failed; skipping event"),
            }
        }

        for id in plan.orphans {
            match self.appointments.delete_scheduled(owner_id, id).await {
                Ok(true) => summary.removed += 1,
                Ok(false) => {
                    info!(owner_id, appointment_id = %id, "Orphan no longer scheduled; kept")
                }
                Err(e) => warn!(owner_id, appointment_id = %id, error = %e, "Orphan delete failed"),
            }
        }

        info!(
            owner_id,
            fetched = events.len(),
            processed = summary.processed,
            removed = summary.removed,
            skipped = summary.skipped,
            "Calendar sync finished"
        );
        Ok(summary)
    }
}
