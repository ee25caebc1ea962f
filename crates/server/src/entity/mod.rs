//! SeaORM entities for the parcel-guardian schema.

pub mod event;
pub mod exception_rule;
pub mod tracking;
pub mod tracking_check;
pub mod tracking_email;
pub mod tracking_exception;
pub mod user;
