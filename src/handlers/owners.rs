use axum::{Json, extract::State};
use chrono::Utc;
use std::time::Duration;
use tracing::info;

use crate::middleware::extract::{ApiJson, ApiPath, ApiQuery};
use crate::service::SyncSummary;
use crate::service::metrics::{self, HistoryReport, MonthlyMetrics, YearMonth};
use crate::types::requests::{
    ApiOk, CredentialStatus, MetricsQuery, ReportQuery, SignInRequest,
};
use crate::{AgendaError, router::AgendaState};

/// Upper bound for `?months=` on the history report.
const MAX_REPORT_MONTHS: u32 = 36;

/// PUT /api/owners/{owner_id}/credential -> store tokens obtained at sign-in
pub async fn store_credential(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
    ApiJson(body): ApiJson<SignInRequest>,
) -> Result<Json<ApiOk<CredentialStatus>>, AgendaError> {
    let cred = state
        .credentials
        .store_sign_in(
            &owner_id,
            body.access_token,
            body.refresh_token,
            body.expires_in.map(Duration::from_secs),
        )
        .await?;
    Ok(Json(ApiOk::new(
        "Credential stored",
        CredentialStatus {
            expiry: cred.expiry,
            has_refresh_token: cred.refresh_token.is_some(),
        },
    )))
}

/// POST /api/owners/{owner_id}/sync
pub async fn sync_calendar(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
) -> Result<Json<ApiOk<SyncSummary>>, AgendaError> {
    info!(owner_id = %owner_id, "Calendar sync requested");
    let summary = state.sync.sync(&owner_id).await?;
    Ok(Json(ApiOk::new(
        format!(
            "Sync finished: {} events processed, {} removed",
            summary.processed, summary.removed
        ),
        summary,
    )))
}

/// GET /api/owners/{owner_id}/metrics?month=YYYY-MM
pub async fn monthly_metrics(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<MetricsQuery>,
) -> Result<Json<ApiOk<MonthlyMetrics>>, AgendaError> {
    let month = match query.month.as_deref() {
        Some(raw) => YearMonth::parse(raw)
            .ok_or_else(|| AgendaError::invalid("month", "expected YYYY-MM"))?,
        None => YearMonth::containing(Utc::now()),
    };
    let all = state.appointments.list_by_owner(&owner_id).await?;
    let data = metrics::monthly_metrics(&all, month, state.billing.monthly_goal);
    Ok(Json(ApiOk::new(format!("Metrics for {}", data.month), data)))
}

/// GET /api/owners/{owner_id}/reports?months=N
pub async fn history_report(
    State(state): State<AgendaState>,
    ApiPath(owner_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<ApiOk<HistoryReport>>, AgendaError> {
    let months = query.months.unwrap_or(state.billing.report_months);
    if !(1..=MAX_REPORT_MONTHS).contains(&months) {
        return Err(AgendaError::invalid(
            "months",
            format!("must be between 1 and {MAX_REPORT_MONTHS}"),
        ));
    }
    let all = state.appointments.list_by_owner(&owner_id).await?;
    let data = metrics::history_report(&all, Utc::now(), months);
    Ok(Json(ApiOk::new(
        format!("Report for the last {months} months"),
        data,
    )))
}
