//! Document use-case service.
//!
//! # Responsibility
//! - Create documents with a clock-derived tracking day and timestamps.
//! - Complete checkpoints and report completion progress.
//! - Expose document queries and free-text edits.
//!
//! # Invariants
//! - Tracking ids are keyed on the clock's `today()`, not the document date.
//! - Logs carry ids and statuses only; notes and remarks text never reach
//!   the log sink.

use crate::clock::{Clock, SystemClock};
use crate::model::catalog::{DocumentTypeId, RouteId};
use crate::model::document::{
    Document, DocumentCheckpoint, DocumentCheckpointId, DocumentId, LOCATION_MAX_CHARS,
    RECEIVER_NAME_MAX_CHARS,
};
use crate::model::tracking_id::TrackingId;
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use crate::repo::document_repo::{
    CheckpointCompletion, DocumentDetailsUpdate, DocumentListQuery, DocumentRepository,
    NewDocument,
};
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{error, info};

/// Input for [`DocumentService::create_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDocumentRequest {
    pub document_type_id: DocumentTypeId,
    pub route_id: RouteId,
    pub document_date: NaiveDate,
    pub exam_date: Option<NaiveDate>,
    pub current_location: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
}

impl CreateDocumentRequest {
    /// Request with only the required references set.
    pub fn new(
        document_type_id: DocumentTypeId,
        route_id: RouteId,
        document_date: NaiveDate,
    ) -> Self {
        Self {
            document_type_id,
            route_id,
            document_date,
            exam_date: None,
            current_location: None,
            notes: None,
            created_by: None,
        }
    }
}

/// Document service facade.
pub struct DocumentService<R: DocumentRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: DocumentRepository> DocumentService<R, SystemClock> {
    /// Creates service on the UTC wall clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: DocumentRepository, C: Clock> DocumentService<R, C> {
    /// Creates service with an explicit time source.
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Creates one document with checkpoints cloned from its type.
    pub fn create_document(&self, request: &CreateDocumentRequest) -> ServiceResult<Document> {
        let document = NewDocument {
            document_type_id: request.document_type_id,
            route_id: request.route_id,
            document_date: request.document_date,
            exam_date: request.exam_date,
            current_location: normalize_text(
                "current location",
                request.current_location.as_deref(),
                LOCATION_MAX_CHARS,
            )?,
            notes: request
                .notes
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            created_by: request.created_by,
        };

        let tracking_date = self.clock.today();
        match self
            .repo
            .create_document(&document, tracking_date, self.clock.now_ms())
        {
            Ok(created) => {
                info!(
                    "event=document_create module=service status=ok document_id={} tracking_id={} checkpoints={}",
                    created.id,
                    created.tracking_id,
                    created.checkpoints.len()
                );
                Ok(created)
            }
            Err(err) => {
                let err = ServiceError::from(err);
                error!(
                    "event=document_create module=service status=error tracking_date={} error={}",
                    tracking_date,
                    error_kind(&err)
                );
                Err(err)
            }
        }
    }

    /// Marks one checkpoint complete and returns the recomputed document.
    ///
    /// Completing an already completed checkpoint overwrites its completer,
    /// timestamp, receiver and remarks.
    pub fn complete_checkpoint(
        &self,
        checkpoint_id: DocumentCheckpointId,
        completed_by: UserId,
        receiver_name: &str,
        remarks: &str,
    ) -> ServiceResult<Document> {
        let previous = self
            .repo
            .get_checkpoint(checkpoint_id)?
            .ok_or(ServiceError::CheckpointNotFound(checkpoint_id))?;

        let completion = CheckpointCompletion {
            checkpoint_id,
            completed_by,
            completed_at: self.clock.now_ms(),
            receiver_name: normalize_text(
                "receiver name",
                Some(receiver_name),
                RECEIVER_NAME_MAX_CHARS,
            )?,
            remarks: remarks.trim().to_string(),
        };
        let document = self.repo.complete_checkpoint(&completion)?;

        info!(
            "event=checkpoint_complete module=service status=ok document_id={} checkpoint_id={} sequence_order={} document_status={}",
            document.id,
            checkpoint_id,
            previous.sequence_order,
            document.status.as_str()
        );
        if document.is_finalized && !previous.is_completed {
            info!(
                "event=document_finalized module=service status=ok document_id={} tracking_id={}",
                document.id, document.tracking_id
            );
        }
        Ok(document)
    }

    /// Whole-percent share of completed checkpoints, `0..=100`.
    pub fn completion_percentage(&self, document: &Document) -> u8 {
        document.completion_percentage()
    }

    pub fn get_document(&self, id: DocumentId) -> ServiceResult<Option<Document>> {
        Ok(self.repo.get_document(id)?)
    }

    /// Looks a document up by its `DTS-YYYYMMDD-NNNN` key.
    pub fn get_document_by_tracking_id(&self, tracking_id: &str) -> ServiceResult<Option<Document>> {
        let tracking_id = TrackingId::parse(tracking_id.trim())?;
        Ok(self.repo.get_document_by_tracking_id(&tracking_id)?)
    }

    /// Checkpoints of one document in sequence order.
    pub fn list_checkpoints(&self, document_id: DocumentId) -> ServiceResult<Vec<DocumentCheckpoint>> {
        if self.repo.get_document(document_id)?.is_none() {
            return Err(ServiceError::DocumentNotFound(document_id));
        }
        Ok(self.repo.list_checkpoints(document_id)?)
    }

    pub fn list_documents(&self, query: &DocumentListQuery) -> ServiceResult<Vec<Document>> {
        Ok(self.repo.list_documents(query)?)
    }

    /// Edits location and/or notes; `None` leaves a field untouched.
    pub fn update_document_details(
        &self,
        id: DocumentId,
        current_location: Option<&str>,
        notes: Option<&str>,
    ) -> ServiceResult<Document> {
        let update = DocumentDetailsUpdate {
            current_location: current_location
                .map(|value| normalize_text("current location", Some(value), LOCATION_MAX_CHARS))
                .transpose()?,
            notes: notes.map(|value| value.trim().to_string()),
        };
        Ok(self
            .repo
            .update_document_details(id, &update, self.clock.now_ms())?)
    }
}

/// Trims optional bounded text; blank is allowed.
fn normalize_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::NameTooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}

fn error_kind(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::DuplicateName { .. } => "duplicate_name",
        ServiceError::DuplicateSequence { .. } => "duplicate_sequence",
        ServiceError::Reference { .. } => "reference",
        ServiceError::IdentifierExhaustion { .. } => "identifier_exhaustion",
        ServiceError::ProtectedReference { .. } => "protected_reference",
        ServiceError::Validation(_) => "validation",
        ServiceError::DocumentNotFound(_) => "document_not_found",
        ServiceError::CheckpointNotFound(_) => "checkpoint_not_found",
        ServiceError::NotFound { .. } => "not_found",
        ServiceError::Repo(_) => "repo",
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_text;
    use crate::model::validation::ValidationError;

    #[test]
    fn optional_text_is_trimmed_and_bounded() {
        assert_eq!(normalize_text("receiver name", None, 5).unwrap(), "");
        assert_eq!(
            normalize_text("receiver name", Some("  Ana  "), 5).unwrap(),
            "Ana"
        );
        assert_eq!(
            normalize_text("receiver name", Some("Anabelle"), 5),
            Err(ValidationError::NameTooLong {
                field: "receiver name",
                max_chars: 5
            })
        );
    }
}
