//! Document aggregate: a tracked document and its checkpoint copies.
//!
//! # Responsibility
//! - Define the document/checkpoint records returned by repositories.
//! - Own the pure status derivation and completion percentage rules.
//!
//! # Invariants
//! - `is_finalized == true` iff `status == DocumentStatus::Finalized`.
//! - `checkpoints` are sorted by `sequence_order` ascending.
//! - `tracking_id` is assigned once at creation and never changes.

use crate::model::catalog::{DocumentTypeId, RouteId};
use crate::model::tracking_id::TrackingId;
use crate::model::user::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DocumentId = Uuid;
pub type DocumentCheckpointId = Uuid;

pub const LOCATION_MAX_CHARS: usize = 100;
pub const RECEIVER_NAME_MAX_CHARS: usize = 100;

/// Aggregate status derived from checkpoint completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// No checkpoint completed yet.
    Pending,
    /// Some, but not all, checkpoints completed.
    InProgress,
    /// Every checkpoint completed.
    Finalized,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Finalized => "finalized",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }

    pub fn is_finalized(self) -> bool {
        self == Self::Finalized
    }
}

/// One step of a document's completion sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCheckpoint {
    pub id: DocumentCheckpointId,
    pub document_id: DocumentId,
    pub name: String,
    pub sequence_order: i64,
    pub is_completed: bool,
    pub completed_by: Option<UserId>,
    /// Epoch ms, set on completion.
    pub completed_at: Option<i64>,
    pub receiver_name: String,
    pub remarks: String,
}

/// Aggregate root for tracking metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tracking_id: TrackingId,
    pub document_type_id: DocumentTypeId,
    pub route_id: RouteId,
    pub document_date: NaiveDate,
    pub exam_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub current_location: String,
    pub is_finalized: bool,
    pub notes: String,
    pub created_by: Option<UserId>,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
    pub checkpoints: Vec<DocumentCheckpoint>,
}

impl Document {
    /// Share of completed checkpoints, see [`completion_percentage`].
    pub fn completion_percentage(&self) -> u8 {
        completion_percentage(&self.checkpoints)
    }

    /// First incomplete checkpoint in sequence order.
    pub fn next_checkpoint(&self) -> Option<&DocumentCheckpoint> {
        self.checkpoints
            .iter()
            .find(|checkpoint| !checkpoint.is_completed)
    }
}

/// Derives document status from its full checkpoint set.
///
/// Rules, in order:
/// - no checkpoints at all -> `Pending`. The all-complete rule below is not
///   applied vacuously, so a type without templates never yields documents
///   that are finalized on creation. Completion never reaches this case;
/// - no incomplete checkpoint -> `Finalized`;
/// - at least one completed -> `InProgress`;
/// - otherwise -> `Pending`.
pub fn recompute_status(checkpoints: &[DocumentCheckpoint]) -> DocumentStatus {
    if checkpoints.is_empty() {
        return DocumentStatus::Pending;
    }

    let completed = completed_count(checkpoints);
    if completed == checkpoints.len() {
        DocumentStatus::Finalized
    } else if completed > 0 {
        DocumentStatus::InProgress
    } else {
        DocumentStatus::Pending
    }
}

/// `floor(100 * completed / total)`, or 0 for an empty set.
pub fn completion_percentage(checkpoints: &[DocumentCheckpoint]) -> u8 {
    let total = checkpoints.len();
    if total == 0 {
        return 0;
    }
    let percent = completed_count(checkpoints) * 100 / total;
    // completed <= total, so percent <= 100
    percent as u8
}

fn completed_count(checkpoints: &[DocumentCheckpoint]) -> usize {
    checkpoints
        .iter()
        .filter(|checkpoint| checkpoint.is_completed)
        .count()
}

#[cfg(test)]
mod tests {
    use super::{completion_percentage, recompute_status, DocumentCheckpoint, DocumentStatus};
    use uuid::Uuid;

    fn checkpoints(flags: &[bool]) -> Vec<DocumentCheckpoint> {
        let document_id = Uuid::new_v4();
        flags
            .iter()
            .enumerate()
            .map(|(index, done)| DocumentCheckpoint {
                id: Uuid::new_v4(),
                document_id,
                name: format!("step {}", index + 1),
                sequence_order: index as i64 + 1,
                is_completed: *done,
                completed_by: None,
                completed_at: done.then_some(1_000),
                receiver_name: String::new(),
                remarks: String::new(),
            })
            .collect()
    }

    #[test]
    fn status_follows_completion_progress() {
        assert_eq!(
            recompute_status(&checkpoints(&[false, false, false])),
            DocumentStatus::Pending
        );
        assert_eq!(
            recompute_status(&checkpoints(&[true, false, false])),
            DocumentStatus::InProgress
        );
        assert_eq!(
            recompute_status(&checkpoints(&[false, false, true])),
            DocumentStatus::InProgress
        );
        assert_eq!(
            recompute_status(&checkpoints(&[true, true, true])),
            DocumentStatus::Finalized
        );
    }

    #[test]
    fn empty_checkpoint_set_stays_pending() {
        assert_eq!(recompute_status(&[]), DocumentStatus::Pending);
    }

    #[test]
    fn percentage_floors_and_handles_empty_set() {
        assert_eq!(completion_percentage(&[]), 0);
        assert_eq!(completion_percentage(&checkpoints(&[true, false, false])), 33);
        assert_eq!(completion_percentage(&checkpoints(&[true, true, false])), 66);
        assert_eq!(completion_percentage(&checkpoints(&[true, true, true])), 100);
    }

    #[test]
    fn percentage_is_monotonic_as_steps_complete() {
        let mut flags = vec![false; 7];
        let mut previous = completion_percentage(&checkpoints(&flags));
        for index in 0..flags.len() {
            flags[index] = true;
            let current = completion_percentage(&checkpoints(&flags));
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(previous, 100);
    }

    #[test]
    fn status_serializes_as_snake_case() {
        assert_eq!(DocumentStatus::InProgress.as_str(), "in_progress");
        assert_eq!(
            DocumentStatus::parse("finalized"),
            Some(DocumentStatus::Finalized)
        );
    }
}
