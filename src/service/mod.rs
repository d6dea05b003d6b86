pub mod credential_manager;
pub mod effectuation;
pub mod metrics;
pub mod reconcile;
pub mod sync;

pub use credential_manager::CredentialManager;
pub use effectuation::{EffectuationReceipt, EffectuationService, MirrorSettings};
pub use sync::{SyncService, SyncSummary};
