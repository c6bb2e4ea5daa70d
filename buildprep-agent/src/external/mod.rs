//! Collaborators outside the package engine: the database script and the
//! deployment service.

pub mod database;
pub mod service;

pub use database::{CommandDatabaseScript, DatabaseOutcome, DatabaseScript};
pub use service::{CommandServiceControl, ServiceControl};
