use crate::api::calendar_api::CalendarGateway;
use crate::config::{BillingConfig, Config};
use crate::db::{AppointmentsStorage, CredentialsStorage, SqlitePool};
use crate::google_oauth::OauthSettings;
use crate::handlers::{appointments, owners};
use crate::middleware::auth::RequireApiKey;
use crate::service::{
    CredentialManager, EffectuationService, MirrorSettings, SyncService,
};
use axum::{
    Json, Router,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Everything a request handler needs; cheap to clone.
#[derive(Clone)]
pub struct AgendaState {
    pub appointments: AppointmentsStorage,
    pub credentials: CredentialManager,
    pub sync: SyncService,
    pub effectuation: EffectuationService,
    pub billing: Arc<BillingConfig>,
    pub api_key: Arc<str>,
}

impl AgendaState {
    pub fn new(pool: SqlitePool, http: reqwest::Client, cfg: &Config) -> Self {
        let appointments = AppointmentsStorage::new(pool.clone());
        let credentials = CredentialManager::new(
            CredentialsStorage::new(pool),
            OauthSettings::from(&cfg.google),
            http.clone(),
        );
        let gateway = CalendarGateway::new(http, &cfg.google);

        let sync = SyncService::new(
            credentials.clone(),
            gateway.clone(),
            appointments.clone(),
            cfg.billing.default_standard_price,
        );
        let effectuation = EffectuationService::new(
            credentials.clone(),
            gateway,
            appointments.clone(),
            MirrorSettings::from(&cfg.billing),
        );

        Self {
            appointments,
            credentials,
            sync,
            effectuation,
            billing: Arc::new(cfg.billing.clone()),
            api_key: Arc::from(cfg.basic.api_key.as_str()),
        }
    }
}

pub fn agenda_router(state: AgendaState) -> Router {
    let owner_routes = Router::new()
        .route("/credential", put(owners::store_credential))
        .route("/sync", post(owners::sync_calendar))
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/{appointment_id}",
            get(appointments::get_appointment).delete(appointments::delete_appointment),
        )
        .route(
            "/appointments/{appointment_id}/effectuate",
            post(appointments::effectuate_appointment),
        )
        .route("/metrics", get(owners::monthly_metrics))
        .route("/reports", get(owners::history_report));

    let api = Router::new()
        .route("/plans", get(appointments::list_plans))
        .nest("/owners/{owner_id}", owner_routes)
        .route_layer(axum::middleware::from_extractor_with_state::<RequireApiKey, _>(
            state.clone(),
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
