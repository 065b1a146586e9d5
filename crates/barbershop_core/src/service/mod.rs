//! Core use-case services.
//!
//! # Responsibility
//! - Enforce domain rules before any repository call.
//! - Translate repository outcomes into caller-facing errors.
//! - Keep callers decoupled from storage details.

pub mod barber_service;
