//! Barber use-case service.
//!
//! # Responsibility
//! - Expose list/get/create/update/delete for barbers.
//! - Validate schedule windows, names and update identity.
//! - Classify optimistic-concurrency failures as `NotFound` or `Conflict`.
//!
//! # Invariants
//! - Invalid input never reaches the repository.
//! - Storage errors are propagated unchanged; nothing is retried.
//! - The service holds no state between calls besides its repository.

use crate::model::barber::{
    Barber, BarberId, BarberUpdate, BarberValidationError, NewBarber, Version,
};
use crate::repo::barber_repo::{BarberRepository, RepoError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error for barber use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Input violates a domain rule; nothing was written.
    Validation(BarberValidationError),
    /// Addressed barber does not exist.
    NotFound(BarberId),
    /// Another writer updated the barber after `expected` was observed.
    /// Re-read and decide whether to reapply.
    Conflict { id: BarberId, expected: Version },
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "barber not found: {id}"),
            Self::Conflict { id, expected } => write!(
                f,
                "barber {id} was modified by another writer since version {expected}; reload and retry"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::Conflict { .. } => None,
        }
    }
}

impl From<BarberValidationError> for ServiceError {
    fn from(value: BarberValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Barber resource manager over a repository implementation.
pub struct BarberService<R: BarberRepository> {
    repo: R,
}

impl<R: BarberRepository> BarberService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists all barbers sorted by `name ASC, id ASC`.
    pub fn list(&self) -> ServiceResult<Vec<Barber>> {
        Ok(self.repo.list_barbers()?)
    }

    /// Gets one barber by id.
    pub fn get(&self, id: BarberId) -> ServiceResult<Barber> {
        self.repo.get_barber(id)?.ok_or(ServiceError::NotFound(id))
    }

    /// Validates and inserts a new barber.
    ///
    /// # Contract
    /// - Rejects `start_time >= end_time`, then empty names.
    /// - Returns the stored record with its assigned id and version 1.
    pub fn create(&self, candidate: &NewBarber) -> ServiceResult<Barber> {
        candidate.validate().inspect_err(|err| {
            debug!(
                "event=barber_create module=service status=rejected reason={}",
                err
            );
        })?;

        let created = self.repo.insert_barber(candidate)?;
        info!(
            "event=barber_create module=service status=ok barber_id={} version={}",
            created.id, created.version
        );
        Ok(created)
    }

    /// Replaces every field of barber `id`.
    ///
    /// # Contract
    /// - `update.id` must equal `id`.
    /// - Same schedule/name rules as [`Self::create`].
    /// - Writes only if the stored version equals `update.expected_version`
    ///   (or the version read at the start of this call when `None`).
    /// - A lost race against a delete yields `NotFound`; against another
    ///   update yields `Conflict`. Never retried.
    pub fn update(&self, id: BarberId, update: &BarberUpdate) -> ServiceResult<Barber> {
        if update.id != id {
            debug!(
                "event=barber_update module=service status=rejected barber_id={} reason=id_mismatch",
                id
            );
            return Err(BarberValidationError::IdMismatch {
                path_id: id,
                body_id: update.id,
            }
            .into());
        }
        update.fields.validate().inspect_err(|err| {
            debug!(
                "event=barber_update module=service status=rejected barber_id={} reason={}",
                id, err
            );
        })?;

        let current = self.get(id)?;
        let expected = update.expected_version.unwrap_or(current.version);

        match self.repo.update_barber_if_version(id, &update.fields, expected) {
            Ok(updated) => {
                info!(
                    "event=barber_update module=service status=ok barber_id={} version={}",
                    id, updated.version
                );
                Ok(updated)
            }
            Err(RepoError::VersionConflict { actual, .. }) => {
                if !self.repo.barber_exists(id)? {
                    warn!(
                        "event=barber_update module=service status=not_found barber_id={} reason=deleted_concurrently",
                        id
                    );
                    return Err(ServiceError::NotFound(id));
                }
                warn!(
                    "event=barber_update module=service status=conflict barber_id={} expected_version={} stored_version={}",
                    id, expected, actual
                );
                Err(ServiceError::Conflict { id, expected })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes barber `id`. Absent ids succeed without side effects.
    pub fn delete(&self, id: BarberId) -> ServiceResult<()> {
        let removed = self.repo.delete_barber(id)?;
        info!(
            "event=barber_delete module=service status=ok barber_id={} removed={}",
            id, removed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BarberService, ServiceError};
    use crate::model::barber::{Barber, BarberFields, BarberId, BarberUpdate, NewBarber, Version};
    use crate::repo::barber_repo::{BarberRepository, RepoError, RepoResult};
    use chrono::NaiveTime;
    use std::cell::Cell;

    /// Repository that always loses the check-and-set, with the row
    /// optionally disappearing right after.
    struct RacingRepo {
        deleted_after_race: bool,
        exists_calls: Cell<u32>,
    }

    impl RacingRepo {
        fn stored() -> Barber {
            Barber {
                id: 7,
                name: "Ali".to_string(),
                specialization: "Fade".to_string(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                version: 3,
            }
        }
    }

    impl BarberRepository for RacingRepo {
        fn get_barber(&self, id: BarberId) -> RepoResult<Option<Barber>> {
            Ok((id == 7).then(Self::stored))
        }

        fn list_barbers(&self) -> RepoResult<Vec<Barber>> {
            Ok(vec![Self::stored()])
        }

        fn insert_barber(&self, _barber: &NewBarber) -> RepoResult<Barber> {
            panic!("insert must not be reached");
        }

        fn update_barber_if_version(
            &self,
            id: BarberId,
            _fields: &BarberFields,
            expected_version: Version,
        ) -> RepoResult<Barber> {
            Err(RepoError::VersionConflict {
                id,
                expected: expected_version,
                actual: expected_version + 1,
            })
        }

        fn delete_barber(&self, _id: BarberId) -> RepoResult<bool> {
            Ok(false)
        }

        fn barber_exists(&self, _id: BarberId) -> RepoResult<bool> {
            self.exists_calls.set(self.exists_calls.get() + 1);
            Ok(!self.deleted_after_race)
        }
    }

    fn update_for(barber: &Barber) -> BarberUpdate {
        BarberUpdate::from_observed(barber, barber.fields())
    }

    #[test]
    fn lost_race_against_update_is_conflict() {
        let service = BarberService::new(RacingRepo {
            deleted_after_race: false,
            exists_calls: Cell::new(0),
        });
        let barber = RacingRepo::stored();

        let err = service.update(7, &update_for(&barber)).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { id: 7, expected: 3 }));
        assert_eq!(service.repo.exists_calls.get(), 1);
    }

    #[test]
    fn lost_race_against_delete_is_not_found() {
        let service = BarberService::new(RacingRepo {
            deleted_after_race: true,
            exists_calls: Cell::new(0),
        });
        let barber = RacingRepo::stored();

        let err = service.update(7, &update_for(&barber)).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(7)));
    }

    #[test]
    fn invalid_create_never_reaches_repository() {
        let service = BarberService::new(RacingRepo {
            deleted_after_race: false,
            exists_calls: Cell::new(0),
        });
        let candidate = BarberFields::new(
            "Veli",
            "",
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        );

        let err = service.create(&candidate).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
