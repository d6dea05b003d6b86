use crate::db::models::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentStatus, DbCredential, Effectuation,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::AgendaError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

const APPOINTMENT_COLUMNS: &str = "id, owner_id, client_name, client_contact, status, \
    external_event_id, scheduled_at, plan, standard_price, charged_price, discount, \
    created_at, updated_at";

/// Open (creating if needed) the database and apply the bundled schema.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AgendaError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), AgendaError> {
    // sqlx::query runs one statement at a time
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Appointment records. Every query is filtered by `owner_id`; a row that
/// belongs to another owner is indistinguishable from a missing one.
#[derive(Clone)]
pub struct AppointmentsStorage {
    pool: SqlitePool,
}

impl AppointmentsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All appointments of the owner by `scheduled_at` ascending, undated ones last.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Appointment>, AgendaError> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE owner_id = ? \
             ORDER BY scheduled_at IS NULL, scheduled_at ASC, created_at ASC"
        );
        let rows = sqlx::query(&sql).bind(owner_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    pub async fn list_scheduled_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Appointment>, AgendaError> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE owner_id = ? AND status = ? \
             ORDER BY scheduled_at IS NULL, scheduled_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .bind(AppointmentStatus::Scheduled.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    /// Upsert by unique `external_event_id` using a single
    /// `INSERT ... ON CONFLICT DO UPDATE ... WHERE`.
    ///
    /// An existing row only takes the new client fields and start time, and
    /// only while it is still scheduled and owned by the same owner; completed
    /// rows come back untouched.
    pub async fn upsert_by_external_id(
        &self,
        draft: AppointmentDraft,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AgendaError> {
        let Some(external_id) = draft.external_event_id.clone() else {
            return Err(AgendaError::invalid(
                "external_event_id",
                "upsert requires an external event id",
            ));
        };
        let now_s = format_ts(now);
        let sql = format!(
            r#"
            INSERT INTO appointments (
                id, owner_id, client_name, client_contact, status, external_event_id,
                scheduled_at, standard_price, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_event_id) DO UPDATE SET
                client_name = excluded.client_name,
                client_contact = excluded.client_contact,
                scheduled_at = excluded.scheduled_at,
                updated_at = excluded.updated_at
            WHERE appointments.owner_id = excluded.owner_id
              AND appointments.status = 'scheduled'
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&draft.owner_id)
            .bind(&draft.client_name)
            .bind(&draft.client_contact)
            .bind(AppointmentStatus::Scheduled.as_str())
            .bind(&external_id)
            .bind(draft.scheduled_at.map(format_ts))
            .bind(draft.standard_price)
            .bind(&now_s)
            .bind(&now_s)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Self::row_to_model(row);
        }

        // Conflict guard declined the update: hand back the stored row as-is.
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE external_event_id = ? AND owner_id = ?"
        );
        let existing = sqlx::query(&sql)
            .bind(&external_id)
            .bind(&draft.owner_id)
            .fetch_optional(&self.pool)
            .await?;
        match existing {
            Some(row) => Self::row_to_model(row),
            None => Err(AgendaError::NotFound(format!(
                "appointment for external event {external_id}"
            ))),
        }
    }

    /// Insert an appointment with no calendar counterpart.
    pub async fn insert_local(
        &self,
        draft: AppointmentDraft,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AgendaError> {
        let now_s = format_ts(now);
        let sql = format!(
            r#"
            INSERT INTO appointments (
                id, owner_id, client_name, client_contact, status, external_event_id,
                scheduled_at, standard_price, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?, ?)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&draft.owner_id)
            .bind(&draft.client_name)
            .bind(&draft.client_contact)
            .bind(AppointmentStatus::Scheduled.as_str())
            .bind(draft.scheduled_at.map(format_ts))
            .bind(draft.standard_price)
            .bind(&now_s)
            .bind(&now_s)
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_model(row)
    }

    pub async fn find_by_id(
        &self,
        owner_id: &str,
        id: AppointmentId,
    ) -> Result<Appointment, AgendaError> {
        let sql =
            format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ? AND owner_id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Self::row_to_model(row),
            None => Err(AgendaError::NotFound(format!("appointment {id}"))),
        }
    }

    /// Flip a scheduled appointment to completed and write plan, charged price
    /// and discount in one conditional statement.
    pub async fn update_effectuation(
        &self,
        owner_id: &str,
        id: AppointmentId,
        effectuation: &Effectuation,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AgendaError> {
        let sql = format!(
            r#"
            UPDATE appointments SET
                status = ?,
                plan = ?,
                charged_price = ?,
                discount = ?,
                updated_at = ?
            WHERE id = ? AND owner_id = ? AND status = ?
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(AppointmentStatus::Completed.as_str())
            .bind(&effectuation.plan)
            .bind(effectuation.charged_price)
            .bind(effectuation.discount)
            .bind(format_ts(now))
            .bind(id.to_string())
            .bind(owner_id)
            .bind(AppointmentStatus::Scheduled.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_model(row),
            // Either gone, foreign, or already transitioned by someone else.
            None => match self.find_by_id(owner_id, id).await {
                Ok(_) => Err(AgendaError::NotScheduled),
                Err(e) => Err(e),
            },
        }
    }

    pub async fn delete_by_id(&self, owner_id: &str, id: AppointmentId) -> Result<(), AgendaError> {
        let res = sqlx::query("DELETE FROM appointments WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AgendaError::NotFound(format!("appointment {id}")));
        }
        Ok(())
    }

    /// Delete only while still scheduled, so a record effectuated in the
    /// meantime survives orphan cleanup. Returns whether a row was removed.
    pub async fn delete_scheduled(
        &self,
        owner_id: &str,
        id: AppointmentId,
    ) -> Result<bool, AgendaError> {
        let res =
            sqlx::query("DELETE FROM appointments WHERE id = ? AND owner_id = ? AND status = ?")
                .bind(id.to_string())
                .bind(owner_id)
                .bind(AppointmentStatus::Scheduled.as_str())
                .execute(&self.pool)
                .await?;
        Ok(res.rows_affected() > 0)
    }

    fn row_to_model(row: SqliteRow) -> Result<Appointment, AgendaError> {
        let id_str: String = row.try_get("id")?;
        let owner_id: String = row.try_get("owner_id")?;
        let client_name: String = row.try_get("client_name")?;
        let client_contact: String = row.try_get("client_contact")?;
        let status_str: String = row.try_get("status")?;
        let external_event_id: Option<String> = row.try_get("external_event_id")?;
        let scheduled_str: Option<String> = row.try_get("scheduled_at")?;
        let plan: Option<String> = row.try_get("plan")?;
        let standard_price: f64 = row.try_get("standard_price")?;
        let charged_price: Option<f64> = row.try_get("charged_price")?;
        let discount: Option<f64> = row.try_get("discount")?;
        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;

        let id = Uuid::parse_str(&id_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status = AppointmentStatus::from_str(&status_str)
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        let scheduled_at = scheduled_str.as_deref().map(parse_ts).transpose()?;

        Ok(Appointment {
            id,
            owner_id,
            client_name,
            client_contact,
            status,
            external_event_id,
            scheduled_at,
            plan,
            standard_price,
            charged_price,
            discount,
            created_at: parse_ts(&created_str)?,
            updated_at: parse_ts(&updated_str)?,
        })
    }
}

/// One calendar credential per owner.
#[derive(Clone)]
pub struct CredentialsStorage {
    pool: SqlitePool,
}

impl CredentialsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_owner(&self, owner_id: &str) -> Result<Option<DbCredential>, AgendaError> {
        let row = sqlx::query(
            r#"SELECT owner_id, access_token, refresh_token, expiry
               FROM credentials WHERE owner_id = ?"#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    /// Store or overwrite the owner's credential (sign-in).
    pub async fn upsert(&self, cred: &DbCredential, now: DateTime<Utc>) -> Result<(), AgendaError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (owner_id, access_token, refresh_token, expiry, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expiry = excluded.expiry,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&cred.owner_id)
        .bind(&cred.access_token)
        .bind(cred.refresh_token.as_deref())
        .bind(format_ts(cred.expiry))
        .bind(format_ts(now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a refreshed access token. A `None` refresh token keeps the stored one.
    pub async fn update_access_token(
        &self,
        owner_id: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
        rotated_refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AgendaError> {
        sqlx::query(
            r#"UPDATE credentials SET
                access_token = ?,
                expiry = ?,
                refresh_token = COALESCE(?, refresh_token),
                updated_at = ?
              WHERE owner_id = ?"#,
        )
        .bind(access_token)
        .bind(format_ts(expiry))
        .bind(rotated_refresh_token)
        .bind(format_ts(now))
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbCredential, AgendaError> {
        let owner_id: String = row.try_get("owner_id")?;
        let access_token: String = row.try_get("access_token")?;
        let refresh_token: Option<String> = row.try_get("refresh_token")?;
        let expiry_str: String = row.try_get("expiry")?;

        Ok(DbCredential {
            owner_id,
            access_token,
            refresh_token,
            expiry: parse_ts(&expiry_str)?,
        })
    }
}
