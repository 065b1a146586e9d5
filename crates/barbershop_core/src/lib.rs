//! Core domain logic for the barbershop back office.
//! This crate owns the barber record store and the rules every write obeys.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, open_db_with_config, DbConfig, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig};
pub use model::barber::{
    normalize_name, Barber, BarberFields, BarberId, BarberUpdate, BarberValidationError,
    NewBarber, Version,
};
pub use repo::barber_repo::{BarberRepository, RepoError, RepoResult, SqliteBarberRepository};
pub use service::barber_service::{BarberService, ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
