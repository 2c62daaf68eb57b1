//! Error taxonomy surfaced to service callers.

use crate::model::catalog::DocumentTypeId;
use crate::model::document::{DocumentCheckpointId, DocumentId};
use crate::model::validation::ValidationError;
use crate::repo::error::{ReferenceIssue, RepoError};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service-level result type.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from catalog, document and user services.
#[derive(Debug)]
pub enum ServiceError {
    /// Name already taken by another entity of the same kind.
    DuplicateName { entity: &'static str, name: String },
    /// Template sequence position already used under the document type.
    DuplicateSequence {
        document_type_id: DocumentTypeId,
        sequence_order: i64,
    },
    /// Referenced entity is missing or inactive.
    Reference {
        entity: &'static str,
        id: Uuid,
        issue: ReferenceIssue,
    },
    /// No tracking id could be allocated for the day.
    IdentifierExhaustion { date: NaiveDate, attempts: u32 },
    /// Delete blocked by referencing documents.
    ProtectedReference {
        entity: &'static str,
        id: Uuid,
        referencing_documents: u64,
    },
    /// Request input rejected.
    Validation(ValidationError),
    /// Target document does not exist.
    DocumentNotFound(DocumentId),
    /// Target checkpoint does not exist.
    CheckpointNotFound(DocumentCheckpointId),
    /// Target catalog or user entity does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Storage-level failure with no domain meaning.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { entity, name } => {
                write!(f, "{entity} name already exists: `{name}`")
            }
            Self::DuplicateSequence {
                document_type_id,
                sequence_order,
            } => write!(
                f,
                "sequence order {sequence_order} already used by document type {document_type_id}"
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
                "cannot delete {entity} {id}: referenced by {referencing_documents} document(s)"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::CheckpointNotFound(id) => write!(f, "checkpoint not found: {id}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateName { entity, name } => Self::DuplicateName { entity, name },
            RepoError::DuplicateSequence {
                owner_id,
                sequence_order,
                ..
            } => Self::DuplicateSequence {
                document_type_id: owner_id,
                sequence_order,
            },
            RepoError::Reference { entity, id, issue } => Self::Reference { entity, id, issue },
            RepoError::IdentifierExhaustion { date, attempts } => {
                Self::IdentifierExhaustion { date, attempts }
            }
            RepoError::ProtectedReference {
                entity,
                id,
                referencing_documents,
            } => Self::ProtectedReference {
                entity,
                id,
                referencing_documents,
            },
            RepoError::NotFound {
                entity: "document",
                id,
            } => Self::DocumentNotFound(id),
            RepoError::NotFound {
                entity: "checkpoint",
                id,
            } => Self::CheckpointNotFound(id),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::repo::error::{ReferenceIssue, RepoError};
    use uuid::Uuid;

    #[test]
    fn not_found_maps_by_entity() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ServiceError::from(RepoError::NotFound { entity: "document", id }),
            ServiceError::DocumentNotFound(found) if found == id
        ));
        assert!(matches!(
            ServiceError::from(RepoError::NotFound { entity: "checkpoint", id }),
            ServiceError::CheckpointNotFound(found) if found == id
        ));
        assert!(matches!(
            ServiceError::from(RepoError::NotFound { entity: "route", id }),
            ServiceError::NotFound { entity: "route", id: found } if found == id
        ));
        assert!(matches!(
            ServiceError::from(RepoError::InvalidData("bad row".to_string())),
            ServiceError::Repo(_)
        ));
    }

    #[test]
    fn reference_error_keeps_issue() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(RepoError::Reference {
            entity: "route",
            id,
            issue: ReferenceIssue::Inactive,
        });
        assert!(matches!(
            err,
            ServiceError::Reference { issue: ReferenceIssue::Inactive, .. }
        ));
        assert_eq!(err.to_string(), format!("route {id} is inactive"));
    }
}
