//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the keyed CRUD contract for barber storage.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories understand identity and the version token only; domain
//!   rules live in the service layer.
//! - Repository APIs return semantic errors (`NotFound`, `VersionConflict`)
//!   alongside DB transport errors.

pub mod barber_repo;
