use crate::api::calendar_api::{CalendarGateway, DeleteOutcome};
use crate::config::{BillingConfig, CompletionMirror};
use crate::db::{Appointment, AppointmentId, AppointmentsStorage, Effectuation};
use crate::error::AgendaError;
use crate::service::credential_manager::CredentialManager;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

/// What happened on the calendar after the local commit. Only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    NotLinked,
    Patched,
    Deleted,
    AlreadyGone,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectuationReceipt {
    pub discount: f64,
    pub appointment: Appointment,
}

/// Calendar presentation of a completed appointment.
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub strategy: CompletionMirror,
    pub title_prefix: String,
    pub color_id: String,
}

impl From<&BillingConfig> for MirrorSettings {
    fn from(cfg: &BillingConfig) -> Self {
        Self {
            strategy: cfg.completion_mirror,
            title_prefix: cfg.completed_title_prefix.clone(),
            color_id: cfg.completed_color_id.clone(),
        }
    }
}

impl MirrorSettings {
    pub fn completed_title(&self, client_name: &str) -> String {
        format!("{} - {}", self.title_prefix, client_name)
    }
}

/// Check plan and charged price before anything is read or written.
pub fn validate_input(plan: &str, charged_price: f64) -> Result<(String, f64), AgendaError> {
    let plan = plan.trim();
    if plan.is_empty() {
        return Err(AgendaError::invalid("plan", "must not be empty"));
    }
    if !charged_price.is_finite() {
        return Err(AgendaError::invalid("chargedPrice", "must be a number"));
    }
    if charged_price < 0.0 {
        return Err(AgendaError::invalid("chargedPrice", "must not be negative"));
    }
    Ok((plan.to_string(), charged_price))
}

/// `standard - charged`, rounded to cents. Negative means an upcharge.
pub fn compute_discount(standard_price: f64, charged_price: f64) -> f64 {
    ((standard_price - charged_price) * 100.0).round() / 100.0
}

/// Marks appointments completed. The local record is committed first; the
/// calendar is updated afterwards on a best-effort basis.
#[derive(Clone)]
pub struct EffectuationService {
    credentials: CredentialManager,
    gateway: CalendarGateway,
    appointments: AppointmentsStorage,
    mirror: MirrorSettings,
}

impl EffectuationService {
    pub fn new(
        credentials: CredentialManager,
        gateway: CalendarGateway,
        appointments: AppointmentsStorage,
        mirror: MirrorSettings,
    ) -> Self {
        Self {
            credentials,
            gateway,
            appointments,
            mirror,
        }
    }

    pub async fn effectuate(
        &self,
        owner_id: &str,
        appointment_id: AppointmentId,
        plan: &str,
        charged_price: f64,
    ) -> Result<EffectuationReceipt, AgendaError> {
        let (plan, charged_price) = validate_input(plan, charged_price)?;

        let current = self.appointments.find_by_id(owner_id, appointment_id).await?;
        if !current.is_scheduled() {
            return Err(AgendaError::NotScheduled);
        }

        let effectuation = Effectuation {
            plan,
            charged_price,
            discount: compute_discount(current.standard_price, charged_price),
        };
        let updated = self
            .appointments
            .update_effectuation(owner_id, appointment_id, &effectuation, Utc::now())
            .await
            .inspect_err(|e| {
                warn!(owner_id, appointment_id = %appointment_id, error = %e, "Effectuation not persisted")
            })?;

        info!(
            owner_id,
            appointment_id = %appointment_id,
            plan = %effectuation.plan,
            discount = effectuation.discount,
            "Appointment completed"
        );

        let outcome = self.reflect_completion(owner_id, &updated).await;
        match &outcome {
            MirrorOutcome::Failed(reason) => warn!(
                owner_id,
                appointment_id = %appointment_id,
                reason = %reason,
                "Calendar not updated after completion"
            ),
            other => info!(owner_id, appointment_id = %appointment_id, outcome = ?other, "Calendar mirror"),
        }

        Ok(EffectuationReceipt {
            discount: effectuation.discount,
            appointment: updated,
        })
    }

    /// Best-effort projection onto the calendar; never returns an error.
    async fn reflect_completion(&self, owner_id: &str, appointment: &Appointment) -> MirrorOutcome {
        let Some(event_id) = appointment.external_event_id.as_deref() else {
            return MirrorOutcome::NotLinked;
        };

        let token = match self.credentials.valid_access_token(owner_id).await {
            Ok(token) => token,
            Err(e) => return MirrorOutcome::Failed(e.to_string()),
        };

        let result = match self.mirror.strategy {
            CompletionMirror::Patch => self
                .gateway
                .patch_event_summary(
                    &token,
                    event_id,
                    &self.mirror.completed_title(&appointment.client_name),
                    &self.mirror.color_id,
                )
                .await
                .map(|()| MirrorOutcome::Patched),
            CompletionMirror::Delete => {
                self.gateway
                    .delete_event(&token, event_id)
                    .await
                    .map(|outcome| match outcome {
                        DeleteOutcome::Deleted => MirrorOutcome::Deleted,
                        DeleteOutcome::AlreadyGone => MirrorOutcome::AlreadyGone,
                    })
            }
        };

        result.unwrap_or_else(|e| MirrorOutcome::Failed(e.to_string()))
    }
}
