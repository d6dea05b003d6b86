pub mod calendar;
pub mod plans;
pub mod requests;
