//! Repository error type and SQLite constraint translation.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use chrono::NaiveDate;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Why a referenced entity cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceIssue {
    Missing,
    Inactive,
}

impl Display for ReferenceIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "does not exist"),
            Self::Inactive => write!(f, "is inactive"),
        }
    }
}

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Write model rejected before reaching SQL.
    Validation(ValidationError),
    /// Unique name already taken.
    DuplicateName { entity: &'static str, name: String },
    /// Sequence position already used under the same owner.
    DuplicateSequence {
        entity: &'static str,
        owner_id: Uuid,
        sequence_order: i64,
    },
    /// Foreign reference points to a missing or inactive entity.
    Reference {
        entity: &'static str,
        id: Uuid,
        issue: ReferenceIssue,
    },
    /// No tracking id could be allocated for the day.
    IdentifierExhaustion { date: NaiveDate, attempts: u32 },
    /// Delete blocked because documents still reference the entity.
    ProtectedReference {
        entity: &'static str,
        id: Uuid,
        referencing_documents: u64,
    },
    /// Target entity does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateName { entity, name } => {
                write!(f, "{entity} name already exists: `{name}`")
            }
            Self::DuplicateSequence {
                entity,
                owner_id,
                sequence_order,
            } => write!(
                f,
                "{entity} sequence {sequence_order} already used under {owner_id}"
            ),
            Self::Reference { entity, id, issue } => write!(f, "{entity} {id} {issue}"),
            Self::IdentifierExhaustion { date, attempts } => write!(
                f,
                "no tracking id available for {date} after {attempts} attempt(s)"
            ),
            Self::ProtectedReference {
                entity,
                id,
                referencing_documents,
            } => write!(
                f,
                "{entity} {id} is referenced by {referencing_documents} document(s)"
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
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

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Returns the constraint message when `err` is a UNIQUE violation.
///
/// SQLite reports the columns involved, e.g.
/// `UNIQUE constraint failed: documents.tracking_id`.
pub(crate) fn unique_violation(err: &rusqlite::Error) -> Option<&str> {
    constraint_violation(err, ffi::SQLITE_CONSTRAINT_UNIQUE)
}

/// Returns true when `err` is a FOREIGN KEY violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_violation(err, ffi::SQLITE_CONSTRAINT_FOREIGNKEY).is_some()
}

fn constraint_violation(err: &rusqlite::Error, extended_code: i32) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(inner, message) if inner.extended_code == extended_code => {
            Some(message.as_deref().unwrap_or(""))
        }
        _ => None,
    }
}
