//! Database module: models, schema and SQLite storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: owner-scoped storage for appointments and credentials

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentStatus, DbCredential, Effectuation,
};
pub use schema::SQLITE_INIT;
pub use sqlite::{AppointmentsStorage, CredentialsStorage, SqlitePool, connect};
