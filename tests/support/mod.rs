#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, Utc};
use practice_agenda::AgendaState;
use practice_agenda::config::{CompletionMirror, Config};
use practice_agenda::db::{
    Appointment, AppointmentDraft, AppointmentsStorage, CredentialsStorage, DbCredential,
    Effectuation, SqlitePool,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use wiremock::MockServer;

pub const OWNER: &str = "owner-1";
pub const OTHER_OWNER: &str = "owner-2";
pub const TOKEN: &str = "access-1";
pub const API_KEY: &str = "test-key";
pub const EVENTS_PATH: &str = "/calendars/primary/events";

static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// One SQLite temp file plus one mock server standing in for both the
/// calendar API and the token endpoint.
pub struct TestEnv {
    pub server: MockServer,
    pub pool: SqlitePool,
    pub state: AgendaState,
    pub cfg: Config,
    pub database_url: String,
    db_path: PathBuf,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_mirror(mirror: CompletionMirror) -> Self {
        Self::with_config(|cfg| cfg.billing.completion_mirror = mirror).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let server = MockServer::start().await;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut db_path = std::env::temp_dir();
        db_path.push(format!(
            "practice-agenda-{}-{}-{}.sqlite",
            std::process::id(),
            nanos,
            DB_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let database_url = format!("sqlite:{}", db_path.display());
        let pool = practice_agenda::db::connect(&database_url)
            .await
            .expect("failed to open test database");

        let mut cfg = Config::default();
        cfg.basic.api_key = API_KEY.to_string();
        cfg.google.client_id = "client-id".to_string();
        cfg.google.client_secret = "client-secret".to_string();
        cfg.google.calendar_api_base = Url::parse(&server.uri()).expect("mock server uri");
        cfg.google.token_uri =
            Url::parse(&format!("{}/token", server.uri())).expect("mock token uri");
        cfg.google.list_retry_times = 0;
        tweak(&mut cfg);

        let http = practice_agenda::google_oauth::build_http_client(&cfg.google)
            .expect("failed to build http client");
        let state = AgendaState::new(pool.clone(), http, &cfg);

        Self {
            server,
            pool,
            state,
            cfg,
            database_url,
            db_path,
        }
    }

    pub fn appointments(&self) -> AppointmentsStorage {
        AppointmentsStorage::new(self.pool.clone())
    }

    pub async fn store_credential(
        &self,
        owner: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expiry: DateTime<Utc>,
    ) {
        CredentialsStorage::new(self.pool.clone())
            .upsert(
                &DbCredential {
                    owner_id: owner.to_string(),
                    access_token: access_token.to_string(),
                    refresh_token: refresh_token.map(str::to_string),
                    expiry,
                },
                Utc::now(),
            )
            .await
            .expect("failed to store credential");
    }

    /// A credential that stays valid for the whole test.
    pub async fn sign_in(&self, owner: &str) {
        self.store_credential(owner, TOKEN, Some("refresh-1"), Utc::now() + TimeDelta::hours(1))
            .await;
    }

    pub async fn credential(&self, owner: &str) -> Option<DbCredential> {
        CredentialsStorage::new(self.pool.clone())
            .get_by_owner(owner)
            .await
            .expect("failed to read credential")
    }

    /// Insert a calendar-linked scheduled appointment.
    pub async fn seed_linked(&self, owner: &str, event_id: &str, client: &str) -> Appointment {
        self.appointments()
            .upsert_by_external_id(
                AppointmentDraft {
                    owner_id: owner.to_string(),
                    client_name: client.to_string(),
                    client_contact: format!("{}@example.com", client.to_lowercase()),
                    external_event_id: Some(event_id.to_string()),
                    scheduled_at: Some(Utc::now() + TimeDelta::days(1)),
                    standard_price: 150.0,
                },
                Utc::now(),
            )
            .await
            .expect("failed to seed linked appointment")
    }

    /// Insert a local appointment with no calendar event.
    pub async fn seed_local(&self, owner: &str, client: &str) -> Appointment {
        self.appointments()
            .insert_local(
                AppointmentDraft {
                    owner_id: owner.to_string(),
                    client_name: client.to_string(),
                    client_contact: String::new(),
                    external_event_id: None,
                    scheduled_at: Some(Utc::now() + TimeDelta::days(2)),
                    standard_price: 150.0,
                },
                Utc::now(),
            )
            .await
            .expect("failed to seed local appointment")
    }

    pub async fn seed_completed(&self, owner: &str, event_id: &str, client: &str) -> Appointment {
        let appt = self.seed_linked(owner, event_id, client).await;
        self.appointments()
            .update_effectuation(
                owner,
                appt.id,
                &Effectuation {
                    plan: "consulta_avulsa".to_string(),
                    charged_price: 150.0,
                    discount: 0.0,
                },
                Utc::now(),
            )
            .await
            .expect("failed to complete seeded appointment")
    }

    pub async fn all(&self, owner: &str) -> Vec<Appointment> {
        self.appointments()
            .list_by_owner(owner)
            .await
            .expect("failed to list appointments")
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// A timed calendar event as the list endpoint returns it.
pub fn event_json(id: &str, summary: &str, attendee: Option<(&str, &str)>) -> Value {
    let start = (Utc::now() + TimeDelta::days(1)).to_rfc3339();
    let mut ev = json!({
        "id": id,
        "status": "confirmed",
        "summary": summary,
        "start": {"dateTime": start},
        "end": {"dateTime": start},
    });
    if let Some((email, name)) = attendee {
        ev["attendees"] = json!([{"email": email, "displayName": name}]);
    }
    ev
}

pub fn events_page(items: Vec<Value>) -> Value {
    json!({"kind": "calendar#events", "items": items})
}
