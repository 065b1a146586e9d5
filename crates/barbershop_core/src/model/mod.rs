//! Domain model for the barber resource.
//!
//! # Responsibility
//! - Define the canonical barber record and its create/update input shapes.
//! - Own the validation rules every write must pass before persistence.
//!
//! # Invariants
//! - Every persisted barber is identified by a store-assigned `BarberId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod barber;
