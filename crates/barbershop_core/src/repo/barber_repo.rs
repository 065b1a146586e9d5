//! Barber repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD primitives over the `barbers` table.
//! - Maintain the per-row version token and enforce check-and-set on update.
//!
//! # Invariants
//! - `update_barber_if_version` writes only when the stored version equals the
//!   expected one, and bumps it by exactly one.
//! - `delete_barber` is idempotent.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::barber::{
    Barber, BarberFields, BarberId, NewBarber, Version, INITIAL_VERSION,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const BARBERS_TABLE: &str = "barbers";

const REQUIRED_BARBER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "specialization",
    "start_time",
    "end_time",
    "version",
    "updated_at",
];

const BARBER_SELECT_SQL: &str = "SELECT
    id,
    name,
    specialization,
    start_time,
    end_time,
    version
FROM barbers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for barber persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(BarberId),
    /// Stored version moved past the one the writer observed. Nothing was
    /// written.
    VersionConflict {
        id: BarberId,
        expected: Version,
        actual: Version,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "barber not found: {id}"),
            Self::VersionConflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "barber {id} version conflict: expected {expected}, stored {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted barber data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Keyed storage contract for barber records.
pub trait BarberRepository {
    /// Returns one barber, or `None` when the id is absent.
    fn get_barber(&self, id: BarberId) -> RepoResult<Option<Barber>>;
    /// Returns all barbers ordered by `name ASC, id ASC`.
    fn list_barbers(&self) -> RepoResult<Vec<Barber>>;
    /// Inserts a barber and returns it with its assigned id and initial
    /// version.
    fn insert_barber(&self, barber: &NewBarber) -> RepoResult<Barber>;
    /// Replaces all fields of `id` if its stored version is still
    /// `expected_version`.
    fn update_barber_if_version(
        &self,
        id: BarberId,
        fields: &BarberFields,
        expected_version: Version,
    ) -> RepoResult<Barber>;
    /// Removes `id`. Returns `false` when nothing was there to remove.
    fn delete_barber(&self, id: BarberId) -> RepoResult<bool>;
    fn barber_exists(&self, id: BarberId) -> RepoResult<bool>;
}

/// SQLite-backed barber repository borrowing a migrated connection.
pub struct SqliteBarberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBarberRepository<'conn> {
    /// Constructs a repository from a connection opened through
    /// [`crate::db::open_db`] (or an equivalent migrated connection).
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema has
    ///   been tampered with.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl BarberRepository for SqliteBarberRepository<'_> {
    fn get_barber(&self, id: BarberId) -> RepoResult<Option<Barber>> {
        select_barber(self.conn, id)
    }

    fn list_barbers(&self) -> RepoResult<Vec<Barber>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BARBER_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut barbers = Vec::new();

        while let Some(row) = rows.next()? {
            barbers.push(parse_barber_row(row)?);
        }

        Ok(barbers)
    }

    fn insert_barber(&self, barber: &NewBarber) -> RepoResult<Barber> {
        self.conn.execute(
            "INSERT INTO barbers (
                name,
                specialization,
                start_time,
                end_time,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                barber.name.as_str(),
                barber.specialization.as_str(),
                barber.start_time,
                barber.end_time,
                INITIAL_VERSION,
            ],
        )?;

        Ok(Barber {
            id: self.conn.last_insert_rowid(),
            name: barber.name.clone(),
            specialization: barber.specialization.clone(),
            start_time: barber.start_time,
            end_time: barber.end_time,
            version: INITIAL_VERSION,
        })
    }

    fn update_barber_if_version(
        &self,
        id: BarberId,
        fields: &BarberFields,
        expected_version: Version,
    ) -> RepoResult<Barber> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE barbers
             SET
                name = ?3,
                specialization = ?4,
                start_time = ?5,
                end_time = ?6,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND version = ?2;",
            params![
                id,
                expected_version,
                fields.name.as_str(),
                fields.specialization.as_str(),
                fields.start_time,
                fields.end_time,
            ],
        )?;

        if changed == 0 {
            let actual = tx
                .query_row(
                    "SELECT version FROM barbers WHERE id = ?1;",
                    [id],
                    |row| row.get::<_, Version>(0),
                )
                .optional()?;
            // Dropping `tx` here rolls back; nothing was written anyway.
            return match actual {
                None => Err(RepoError::NotFound(id)),
                Some(actual) => Err(RepoError::VersionConflict {
                    id,
                    expected: expected_version,
                    actual,
                }),
            };
        }

        let updated = select_barber(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("barber {id} vanished inside its update transaction"))
        })?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_barber(&self, id: BarberId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM barbers WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn barber_exists(&self, id: BarberId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM barbers WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn select_barber(conn: &Connection, id: BarberId) -> RepoResult<Option<Barber>> {
    let mut stmt = conn.prepare(&format!("{BARBER_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_barber_row(row)?));
    }

    Ok(None)
}

fn parse_barber_row(row: &Row<'_>) -> RepoResult<Barber> {
    let barber = Barber {
        id: row.get("id")?,
        name: row.get("name")?,
        specialization: row.get("specialization")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        version: row.get("version")?,
    };

    if barber.version < INITIAL_VERSION {
        return Err(RepoError::InvalidData(format!(
            "invalid version `{}` in barbers.version for id {}",
            barber.version, barber.id
        )));
    }
    barber
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("barber {}: {err}", barber.id)))?;

    Ok(barber)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    if actual_version > expected_version {
        return Err(RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version: actual_version,
            latest_supported: expected_version,
        }));
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [BARBERS_TABLE],
        |row| row.get(0),
    )?;
    if table_exists != 1 {
        return Err(RepoError::MissingRequiredTable(BARBERS_TABLE));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(barbers);")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<HashSet<_>, _>>()?;
    for column in REQUIRED_BARBER_COLUMNS {
        if !columns.contains(*column) {
            return Err(RepoError::MissingRequiredColumn {
                table: BARBERS_TABLE,
                column: *column,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BarberRepository, RepoError, SqliteBarberRepository};
    use crate::db::open_db_in_memory;
    use crate::model::barber::BarberFields;
    use chrono::NaiveTime;

    fn fields(name: &str) -> BarberFields {
        BarberFields::new(
            name,
            "Fade",
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        )
    }

    #[test]
    fn conflict_reports_stored_version() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBarberRepository::try_new(&conn).unwrap();
        let created = repo.insert_barber(&fields("Ali")).unwrap();
        repo.update_barber_if_version(created.id, &fields("Ali B"), 1)
            .unwrap();

        let err = repo
            .update_barber_if_version(created.id, &fields("Ali C"), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn reversed_schedule_in_storage_is_reported_as_invalid_data() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBarberRepository::try_new(&conn).unwrap();
        let created = repo.insert_barber(&fields("Ali")).unwrap();

        conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
            .unwrap();
        conn.execute(
            "UPDATE barbers SET start_time = '20:00:00' WHERE id = ?1;",
            [created.id],
        )
        .unwrap();

        let err = repo.get_barber(created.id).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
