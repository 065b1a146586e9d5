//! Barber domain model.
//!
//! # Responsibility
//! - Define the persisted `Barber` record plus `NewBarber`/`BarberUpdate`
//!   inputs.
//! - Normalize display names and validate schedule windows.
//!
//! # Invariants
//! - `start_time` is strictly earlier than `end_time`.
//! - `name` is non-empty after normalization.
//! - `version` starts at 1 and only moves forward.

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Store-assigned identity of a barber row.
pub type BarberId = i64;

/// Optimistic concurrency token carried by every persisted barber.
pub type Version = i64;

/// Version assigned to a freshly inserted barber.
pub const INITIAL_VERSION: Version = 1;

/// Validation failures for barber writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarberValidationError {
    /// Name is empty or whitespace-only.
    EmptyName,
    /// Working window is empty or reversed.
    InvalidSchedule { start: NaiveTime, end: NaiveTime },
    /// Body id does not match the id the caller addressed.
    IdMismatch { path_id: BarberId, body_id: BarberId },
}

impl Display for BarberValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidSchedule { start, end } => write!(
                f,
                "start must precede end (start {}, end {})",
                start.format("%H:%M:%S"),
                end.format("%H:%M:%S")
            ),
            Self::IdMismatch { path_id, body_id } => write!(
                f,
                "barber id mismatch: addressed {path_id}, body carries {body_id}"
            ),
        }
    }
}

impl Error for BarberValidationError {}

/// Mutable attribute set shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarberFields {
    pub name: String,
    /// Free text, may be empty.
    pub specialization: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl BarberFields {
    pub fn new(
        name: impl Into<String>,
        specialization: impl Into<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            name: name.into(),
            specialization: specialization.into(),
            start_time,
            end_time,
        }
    }

    /// Returns the first write rule these fields break.
    ///
    /// The schedule is checked before the name so a reversed window is
    /// reported even when the name is also blank. The name is stored exactly
    /// as given; normalization only decides whether it is blank.
    pub fn validate(&self) -> Result<(), BarberValidationError> {
        validate_schedule(self.start_time, self.end_time)?;
        if normalize_name(&self.name).is_empty() {
            return Err(BarberValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Create input: every attribute except identity and version.
pub type NewBarber = BarberFields;

/// Full-replacement update input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarberUpdate {
    /// Must equal the id the caller addresses.
    pub id: BarberId,
    #[serde(flatten)]
    pub fields: BarberFields,
    /// Version the caller last observed. `None` means "whatever is current
    /// when the update starts".
    #[serde(default)]
    pub expected_version: Option<Version>,
}

impl BarberUpdate {
    /// Builds an update that replaces `barber`'s fields and guards on the
    /// version it was read at.
    pub fn from_observed(barber: &Barber, fields: BarberFields) -> Self {
        Self {
            id: barber.id,
            fields,
            expected_version: Some(barber.version),
        }
    }
}

/// Persisted barber record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barber {
    pub id: BarberId,
    pub name: String,
    pub specialization: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub version: Version,
}

impl Barber {
    /// Returns the mutable attribute set of this record.
    pub fn fields(&self) -> BarberFields {
        BarberFields {
            name: self.name.clone(),
            specialization: self.specialization.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Checks persisted-state invariants.
    pub fn validate(&self) -> Result<(), BarberValidationError> {
        validate_schedule(self.start_time, self.end_time)?;
        if self.name.trim().is_empty() {
            return Err(BarberValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Rejects empty or reversed working windows.
pub fn validate_schedule(start: NaiveTime, end: NaiveTime) -> Result<(), BarberValidationError> {
    if start >= end {
        return Err(BarberValidationError::InvalidSchedule { start, end });
    }
    Ok(())
}

/// Trims the name and collapses internal whitespace runs to one space.
pub fn normalize_name(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, validate_schedule, BarberFields, BarberValidationError};
    use chrono::NaiveTime;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn normalize_name_collapses_whitespace() {
        assert_eq!(normalize_name("  Ali \t  Yilmaz\n"), "Ali Yilmaz");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn equal_start_and_end_is_rejected() {
        let err = validate_schedule(hm(9, 0), hm(9, 0)).unwrap_err();
        assert!(matches!(err, BarberValidationError::InvalidSchedule { .. }));
        assert!(err.to_string().contains("start must precede end"));
    }

    #[test]
    fn validate_reports_schedule_before_name() {
        let fields = BarberFields::new(" ", "", hm(10, 0), hm(9, 0));
        assert!(matches!(
            fields.validate(),
            Err(BarberValidationError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn validate_accepts_padded_name_and_leaves_it_untouched() {
        let fields = BarberFields::new("  Ali   Usta ", "Fade", hm(9, 0), hm(18, 0));
        fields.validate().unwrap();
        assert_eq!(fields.name, "  Ali   Usta ");
    }

    #[test]
    fn validate_rejects_blank_name() {
        let fields = BarberFields::new("\t \n", "Fade", hm(9, 0), hm(18, 0));
        assert_eq!(fields.validate(), Err(BarberValidationError::EmptyName));
    }
}
