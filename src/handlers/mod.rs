pub mod appointments;
pub mod owners;
