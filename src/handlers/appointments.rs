use axum::{Json, extract::State};
use chrono::Utc;

use crate::db::{Appointment, AppointmentDraft};
use crate::middleware::extract::{ApiJson, ApiPath, ApiQuery};
use crate::service::metrics::filter_view;
use crate::types::plans::{PLAN_CATALOG, PlanOption};
use crate::types::requests::{
    ApiOk, AppointmentPath, CreateAppointmentRequest, EffectuateRequest, EffectuateResponse,
    ListQuery,
};
use crate::{AgendaError, router::AgendaState};

/// GET /api/owners/{owner_id}/appointments
pub async fn list_appointments(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, AgendaError> {
    let all = state.appointments.list_by_owner(&owner_id).await?;
    let view = filter_view(all, query.status, query.period, Utc::now());
    Ok(Json(ApiOk::new(format!("{} appointments", view.len()), view)))
}

/// POST /api/owners/{owner_id}/appointments -> appointment with no calendar event
pub async fn create_appointment(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
    ApiJson(body): ApiJson<CreateAppointmentRequest>,
) -> Result<Json<ApiOk<Appointment>>, AgendaError> {
    let client_name = body.client_name.trim().to_string();
    if client_name.is_empty() {
        return Err(AgendaError::invalid("client_name", "must not be empty"));
    }
    let standard_price = body
        .standard_price
        .unwrap_or(state.billing.default_standard_price);
    if !standard_price.is_finite() || standard_price < 0.0 {
        return Err(AgendaError::invalid(
            "standard_price",
            "must be a non-negative number",
        ));
    }

    let draft = AppointmentDraft {
        owner_id,
        client_name,
        client_contact: body.client_contact.unwrap_or_default(),
        external_event_id: None,
        scheduled_at: body.scheduled_at,
        standard_price,
    };
    let created = state.appointments.insert_local(draft, Utc::now()).await?;
    Ok(Json(ApiOk::new("Appointment created", created)))
}

/// GET /api/owners/{owner_id}/appointments/{appointment_id}
pub async fn get_appointment(
    State(state): State<AgendaState>,
    ApiPath(path): ApiPath<AppointmentPath>,
) -> Result<Json<ApiOk<Appointment>>, AgendaError> {
    let appointment = state
        .appointments
        .find_by_id(&path.owner_id, path.appointment_id()?)
        .await?;
    Ok(Json(ApiOk::new("Appointment found", appointment)))
}

/// DELETE /api/owners/{owner_id}/appointments/{appointment_id}
pub async fn delete_appointment(
    State(state): State<AgendaState>,
    ApiPath(path): ApiPath<AppointmentPath>,
) -> Result<Json<ApiOk<()>>, AgendaError> {
    state
        .appointments
        .delete_by_id(&path.owner_id, path.appointment_id()?)
        .await?;
    Ok(Json(ApiOk::new("Appointment deleted", ())))
}

/// POST /api/owners/{owner_id}/appointments/{appointment_id}/effectuate
pub async fn effectuate_appointment(
    State(state): State<AgendaState>,
    ApiPath(path): ApiPath<AppointmentPath>,
    ApiJson(body): ApiJson<EffectuateRequest>,
) -> Result<Json<ApiOk<EffectuateResponse>>, AgendaError> {
    let appointment_id = path.appointment_id()?;
    let plan = body
        .plan
        .ok_or_else(|| AgendaError::invalid("plan", "is required"))?;
    let charged_price = body
        .charged_price
        .ok_or_else(|| AgendaError::invalid("chargedPrice", "is required"))?;

    let receipt = state
        .effectuation
        .effectuate(&path.owner_id, appointment_id, &plan, charged_price)
        .await?;
    Ok(Json(ApiOk::new(
        "Appointment marked as completed",
        EffectuateResponse {
            discount: receipt.discount,
        },
    )))
}

/// GET /api/plans
pub async fn list_plans() -> Json<ApiOk<Vec<PlanOption>>> {
    Json(ApiOk::new("Available plans", PLAN_CATALOG.to_vec()))
}
