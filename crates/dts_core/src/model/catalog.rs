//! Catalog reference data: document types, checkpoint templates, routes.
//!
//! # Invariants
//! - Document type and route names are globally unique.
//! - `(document_type_id, sequence_order)` is unique across templates.
//! - Templates are cloned into documents at creation time; later template
//!   edits never reach existing documents.

use crate::model::user::UserId;
use crate::model::validation::{normalize_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DocumentTypeId = Uuid;
pub type CheckpointTemplateId = Uuid;
pub type RouteId = Uuid;

pub const DOCUMENT_TYPE_NAME_MAX_CHARS: usize = 100;
pub const CHECKPOINT_NAME_MAX_CHARS: usize = 100;
pub const ROUTE_NAME_MAX_CHARS: usize = 50;

/// User-defined kind of tracked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: DocumentTypeId,
    pub name: String,
    pub description: String,
    /// Inactive types reject new documents but keep existing ones.
    pub is_active: bool,
    pub created_by: Option<UserId>,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

/// Reusable checkpoint step definition owned by one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointTemplate {
    pub id: CheckpointTemplateId,
    pub document_type_id: DocumentTypeId,
    pub name: String,
    pub sequence_order: i64,
    pub description: String,
}

/// Named distribution path a document follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    /// Epoch ms.
    pub created_at: i64,
}

/// Write model for a new document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocumentType {
    pub name: String,
    pub description: String,
    pub created_by: Option<UserId>,
}

impl NewDocumentType {
    /// Builds a normalized write model; the name is trimmed.
    pub fn new(
        name: &str,
        description: &str,
        created_by: Option<UserId>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: normalize_name("document type name", name, DOCUMENT_TYPE_NAME_MAX_CHARS)?,
            description: description.trim().to_string(),
            created_by,
        })
    }
}

/// Write model for a new checkpoint template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckpointTemplate {
    pub document_type_id: DocumentTypeId,
    pub name: String,
    pub sequence_order: i64,
    pub description: String,
}

impl NewCheckpointTemplate {
    /// Builds a normalized write model.
    ///
    /// Sequence positions start at 1 so the clone order in documents matches
    /// what an operator reads in the catalog.
    pub fn new(
        document_type_id: DocumentTypeId,
        name: &str,
        sequence_order: i64,
        description: &str,
    ) -> Result<Self, ValidationError> {
        if sequence_order < 1 {
            return Err(ValidationError::NonPositiveSequence(sequence_order));
        }
        Ok(Self {
            document_type_id,
            name: normalize_name("checkpoint name", name, CHECKPOINT_NAME_MAX_CHARS)?,
            sequence_order,
            description: description.trim().to_string(),
        })
    }
}

/// Write model for a new route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoute {
    pub name: String,
    pub description: String,
}

impl NewRoute {
    pub fn new(name: &str, description: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: normalize_name("route name", name, ROUTE_NAME_MAX_CHARS)?,
            description: description.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{NewCheckpointTemplate, NewDocumentType, NewRoute};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn new_document_type_trims_name_and_description() {
        let value = NewDocumentType::new("  Invoice  ", " billing ", None).unwrap();
        assert_eq!(value.name, "Invoice");
        assert_eq!(value.description, "billing");
    }

    #[test]
    fn checkpoint_template_rejects_zero_sequence() {
        let err = NewCheckpointTemplate::new(Uuid::new_v4(), "Review", 0, "").unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveSequence(0));
    }

    #[test]
    fn route_name_is_capped_at_fifty_chars() {
        let long = "r".repeat(51);
        assert!(matches!(
            NewRoute::new(&long, ""),
            Err(ValidationError::NameTooLong { max_chars: 50, .. })
        ));
    }
}
