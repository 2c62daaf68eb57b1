//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Allocate tracking ids and persist documents with their checkpoint
//!   copies as one unit.
//! - Apply checkpoint completion and status recomputation as one unit.
//! - Provide filtered document listing.
//!
//! # Invariants
//! - Tracking id allocation reads the day's greatest id and inserts the
//!   successor inside the same `BEGIN IMMEDIATE` transaction. A UNIQUE
//!   collision on `documents.tracking_id` rolls the attempt back and retries
//!   with a fresh read, at most `MAX_TRACKING_ID_ATTEMPTS` times.
//! - A document is never visible without the checkpoints cloned from its
//!   type's templates.
//! - Status is recomputed from the sibling set read inside the completion
//!   transaction, never from a caller-supplied snapshot.

use crate::model::catalog::{DocumentTypeId, RouteId};
use crate::model::document::{
    recompute_status, Document, DocumentCheckpoint, DocumentCheckpointId, DocumentId,
    DocumentStatus,
};
use crate::model::tracking_id::TrackingId;
use crate::model::user::UserId;
use crate::repo::catalog_repo::list_templates;
use crate::repo::error::{unique_violation, ReferenceIssue, RepoError, RepoResult};
use crate::repo::schema::{bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid, TableLayout};
use crate::repo::user_repo::user_exists;
use chrono::NaiveDate;
use log::warn;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use uuid::Uuid;

/// Upper bound on tracking id allocation attempts per creation call.
pub const MAX_TRACKING_ID_ATTEMPTS: u32 = 5;

const DOCUMENTS_DEFAULT_LIMIT: u32 = 50;
const DOCUMENTS_LIMIT_MAX: u32 = 200;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    tracking_id,
    document_type_id,
    route_id,
    document_date,
    exam_date,
    status,
    current_location,
    is_finalized,
    notes,
    created_by,
    created_at,
    updated_at
FROM documents";

const CHECKPOINT_SELECT_SQL: &str = "SELECT
    id,
    document_id,
    name,
    sequence_order,
    is_completed,
    completed_by,
    completed_at,
    receiver_name,
    remarks
FROM document_checkpoints";

const DOCUMENT_TABLES: &[TableLayout] = &[
    (
        "documents",
        &[
            "id",
            "tracking_id",
            "document_type_id",
            "route_id",
            "document_date",
            "exam_date",
            "status",
            "current_location",
            "is_finalized",
            "notes",
            "created_by",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "document_checkpoints",
        &[
            "id",
            "document_id",
            "name",
            "sequence_order",
            "is_completed",
            "completed_by",
            "completed_at",
            "receiver_name",
            "remarks",
        ],
    ),
    ("checkpoint_templates", &["document_type_id", "sequence_order"]),
];

/// Write model for document creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub document_type_id: DocumentTypeId,
    pub route_id: RouteId,
    pub document_date: NaiveDate,
    pub exam_date: Option<NaiveDate>,
    pub current_location: String,
    pub notes: String,
    pub created_by: Option<UserId>,
}

/// Write model for marking one checkpoint completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointCompletion {
    pub checkpoint_id: DocumentCheckpointId,
    pub completed_by: UserId,
    /// Epoch ms.
    pub completed_at: i64,
    pub receiver_name: String,
    pub remarks: String,
}

/// Partial edit of free-text document fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDetailsUpdate {
    pub current_location: Option<String>,
    pub notes: Option<String>,
}

/// Query options for listing documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentListQuery {
    pub status: Option<DocumentStatus>,
    pub document_type_id: Option<DocumentTypeId>,
    pub route_id: Option<RouteId>,
    pub is_finalized: Option<bool>,
    pub document_date: Option<NaiveDate>,
    /// Case-insensitive substring over tracking id and notes.
    pub search: Option<String>,
    /// Defaults to 50 and clamps to 200.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for the document aggregate.
pub trait DocumentRepository {
    /// Allocates a tracking id for `tracking_date` and writes the document
    /// with checkpoints cloned from its type's templates.
    fn create_document(
        &self,
        document: &NewDocument,
        tracking_date: NaiveDate,
        now_ms: i64,
    ) -> RepoResult<Document>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    fn get_document_by_tracking_id(&self, tracking_id: &TrackingId)
        -> RepoResult<Option<Document>>;
    fn get_checkpoint(&self, id: DocumentCheckpointId)
        -> RepoResult<Option<DocumentCheckpoint>>;
    fn list_checkpoints(&self, document_id: DocumentId) -> RepoResult<Vec<DocumentCheckpoint>>;
    /// Completes one checkpoint and returns the recomputed parent document.
    fn complete_checkpoint(&self, completion: &CheckpointCompletion) -> RepoResult<Document>;
    fn update_document_details(
        &self,
        id: DocumentId,
        update: &DocumentDetailsUpdate,
        now_ms: i64,
    ) -> RepoResult<Document>;
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, DOCUMENT_TABLES)?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(
        &self,
        document: &NewDocument,
        tracking_date: NaiveDate,
        now_ms: i64,
    ) -> RepoResult<Document> {
        let id = allocate_with_retry(tracking_date, MAX_TRACKING_ID_ATTEMPTS, |_| {
            try_insert_document(self.conn, document, tracking_date, now_ms)
        })?;
        load_required_document(self.conn, id)
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        load_document(self.conn, "id", id.to_string())
    }

    fn get_document_by_tracking_id(
        &self,
        tracking_id: &TrackingId,
    ) -> RepoResult<Option<Document>> {
        load_document(self.conn, "tracking_id", tracking_id.to_string())
    }

    fn get_checkpoint(
        &self,
        id: DocumentCheckpointId,
    ) -> RepoResult<Option<DocumentCheckpoint>> {
        self.conn
            .query_row(
                &format!("{CHECKPOINT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_checkpoint_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_checkpoints(&self, document_id: DocumentId) -> RepoResult<Vec<DocumentCheckpoint>> {
        load_checkpoints(self.conn, &document_id.to_string())
    }

    fn complete_checkpoint(&self, completion: &CheckpointCompletion) -> RepoResult<Document> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let document_id_text: String = tx
            .query_row(
                "SELECT document_id FROM document_checkpoints WHERE id = ?1;",
                [completion.checkpoint_id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound {
                entity: "checkpoint",
                id: completion.checkpoint_id,
            })?;

        if !user_exists(&tx, completion.completed_by)? {
            return Err(RepoError::Reference {
                entity: "user",
                id: completion.completed_by,
                issue: ReferenceIssue::Missing,
            });
        }

        tx.execute(
            "UPDATE document_checkpoints
             SET is_completed = 1,
                 completed_by = ?2,
                 completed_at = ?3,
                 receiver_name = ?4,
                 remarks = ?5
             WHERE id = ?1;",
            params![
                completion.checkpoint_id.to_string(),
                completion.completed_by.to_string(),
                completion.completed_at,
                completion.receiver_name.as_str(),
                completion.remarks.as_str(),
            ],
        )?;

        let siblings = load_checkpoints(&tx, &document_id_text)?;
        let status = recompute_status(&siblings);
        tx.execute(
            "UPDATE documents
             SET status = ?2,
                 is_finalized = ?3,
                 updated_at = ?4
             WHERE id = ?1;",
            params![
                document_id_text.as_str(),
                status.as_str(),
                bool_to_int(status.is_finalized()),
                completion.completed_at,
            ],
        )?;
        tx.commit()?;

        let document_id = parse_uuid(&document_id_text, "document_checkpoints.document_id")?;
        load_required_document(self.conn, document_id)
    }

    fn update_document_details(
        &self,
        id: DocumentId,
        update: &DocumentDetailsUpdate,
        now_ms: i64,
    ) -> RepoResult<Document> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET current_location = COALESCE(?2, current_location),
                 notes = COALESCE(?3, notes),
                 updated_at = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                update.current_location.as_deref(),
                update.notes.as_deref(),
                now_ms,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "document",
                id,
            });
        }
        load_required_document(self.conn, id)
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(document_type_id) = query.document_type_id {
            sql.push_str(" AND document_type_id = ?");
            bind_values.push(Value::Text(document_type_id.to_string()));
        }
        if let Some(route_id) = query.route_id {
            sql.push_str(" AND route_id = ?");
            bind_values.push(Value::Text(route_id.to_string()));
        }
        if let Some(is_finalized) = query.is_finalized {
            sql.push_str(" AND is_finalized = ?");
            bind_values.push(Value::Integer(bool_to_int(is_finalized)));
        }
        if let Some(document_date) = query.document_date {
            sql.push_str(" AND document_date = ?");
            bind_values.push(Value::Text(document_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let pattern = format!("%{}%", escape_like(search));
                sql.push_str(" AND (tracking_id LIKE ? ESCAPE '\\' OR notes LIKE ? ESCAPE '\\')");
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
            }
        }

        sql.push_str(" ORDER BY created_at DESC, tracking_id DESC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_document_limit(
            query.limit,
        ))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let mut document = parse_document_row(row)?;
            document.checkpoints = load_checkpoints(self.conn, &document.id.to_string())?;
            documents.push(document);
        }
        Ok(documents)
    }
}

/// Normalizes list limit according to the document listing contract.
pub fn normalize_document_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DOCUMENTS_DEFAULT_LIMIT,
        Some(value) => value.min(DOCUMENTS_LIMIT_MAX),
    }
}

/// Outcome of one allocation-and-insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertAttempt {
    Created(DocumentId),
    /// Another writer committed this id first; the attempt was rolled back.
    TrackingIdTaken(TrackingId),
    /// The day already used `MAX_DAILY_SEQUENCE` ids.
    DayExhausted,
}

/// Runs `attempt` until it creates a document or the retry budget is spent.
fn allocate_with_retry(
    tracking_date: NaiveDate,
    max_attempts: u32,
    mut attempt: impl FnMut(u32) -> RepoResult<InsertAttempt>,
) -> RepoResult<DocumentId> {
    for attempt_number in 1..=max_attempts {
        match attempt(attempt_number)? {
            InsertAttempt::Created(id) => return Ok(id),
            InsertAttempt::TrackingIdTaken(tracking_id) => {
                warn!(
                    "event=tracking_id_retry module=repo status=retry attempt={} max_attempts={} tracking_id={}",
                    attempt_number, max_attempts, tracking_id
                );
            }
            InsertAttempt::DayExhausted => {
                return Err(RepoError::IdentifierExhaustion {
                    date: tracking_date,
                    attempts: attempt_number,
                });
            }
        }
    }

    Err(RepoError::IdentifierExhaustion {
        date: tracking_date,
        attempts: max_attempts,
    })
}

fn try_insert_document(
    conn: &Connection,
    document: &NewDocument,
    tracking_date: NaiveDate,
    now_ms: i64,
) -> RepoResult<InsertAttempt> {
    // Dropping `tx` on any early return rolls the attempt back.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    ensure_active_reference(&tx, "document type", "document_types", document.document_type_id)?;
    ensure_active_reference(&tx, "route", "routes", document.route_id)?;
    if let Some(creator) = document.created_by {
        if !user_exists(&tx, creator)? {
            return Err(RepoError::Reference {
                entity: "user",
                id: creator,
                issue: ReferenceIssue::Missing,
            });
        }
    }

    let Some(tracking_id) = next_tracking_id(&tx, tracking_date)? else {
        return Ok(InsertAttempt::DayExhausted);
    };
    let templates = list_templates(&tx, document.document_type_id)?;

    let id = Uuid::new_v4();
    let inserted = tx.execute(
        "INSERT INTO documents (
            id,
            tracking_id,
            document_type_id,
            route_id,
            document_date,
            exam_date,
            status,
            current_location,
            is_finalized,
            notes,
            created_by,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, 0, ?8, ?9, ?10, ?10);",
        params![
            id.to_string(),
            tracking_id.to_string(),
            document.document_type_id.to_string(),
            document.route_id.to_string(),
            document.document_date,
            document.exam_date,
            document.current_location.as_str(),
            document.notes.as_str(),
            document.created_by.map(|value| value.to_string()),
            now_ms,
        ],
    );
    if let Err(err) = inserted {
        if unique_violation(&err).is_some_and(|message| message.contains("documents.tracking_id")) {
            return Ok(InsertAttempt::TrackingIdTaken(tracking_id));
        }
        return Err(err.into());
    }

    for template in &templates {
        tx.execute(
            "INSERT INTO document_checkpoints (
                id,
                document_id,
                name,
                sequence_order,
                is_completed
            ) VALUES (?1, ?2, ?3, ?4, 0);",
            params![
                Uuid::new_v4().to_string(),
                id.to_string(),
                template.name.as_str(),
                template.sequence_order,
            ],
        )?;
    }

    tx.commit()?;
    Ok(InsertAttempt::Created(id))
}

/// Successor of the greatest id issued on `date`, or `None` past the cap.
fn next_tracking_id(conn: &Connection, date: NaiveDate) -> RepoResult<Option<TrackingId>> {
    let prefix = TrackingId::day_prefix(date);
    let last: Option<String> = conn
        .query_row(
            "SELECT tracking_id
             FROM documents
             WHERE substr(tracking_id, 1, ?2) = ?1
             ORDER BY tracking_id DESC
             LIMIT 1;",
            params![prefix.as_str(), prefix.len() as i64],
            |row| row.get(0),
        )
        .optional()?;

    match last {
        None => Ok(Some(TrackingId::first(date))),
        Some(text) => {
            let last = TrackingId::parse(&text).map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid tracking id `{text}` in documents.tracking_id"
                ))
            })?;
            Ok(last.next())
        }
    }
}

fn ensure_active_reference(
    conn: &Connection,
    entity: &'static str,
    table: &'static str,
    id: Uuid,
) -> RepoResult<()> {
    let is_active: Option<i64> = conn
        .query_row(
            &format!("SELECT is_active FROM {table} WHERE id = ?1;"),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match is_active {
        None => Err(RepoError::Reference {
            entity,
            id,
            issue: ReferenceIssue::Missing,
        }),
        Some(0) => Err(RepoError::Reference {
            entity,
            id,
            issue: ReferenceIssue::Inactive,
        }),
        Some(_) => Ok(()),
    }
}

fn load_document(
    conn: &Connection,
    key_column: &'static str,
    key: String,
) -> RepoResult<Option<Document>> {
    let document = conn
        .query_row(
            &format!("{DOCUMENT_SELECT_SQL} WHERE {key_column} = ?1;"),
            [key],
            |row| Ok(parse_document_row(row)),
        )
        .optional()?
        .transpose()?;

    match document {
        Some(mut document) => {
            document.checkpoints = load_checkpoints(conn, &document.id.to_string())?;
            Ok(Some(document))
        }
        None => Ok(None),
    }
}

fn load_required_document(conn: &Connection, id: DocumentId) -> RepoResult<Document> {
    load_document(conn, "id", id.to_string())?.ok_or(RepoError::NotFound {
        entity: "document",
        id,
    })
}

fn load_checkpoints(conn: &Connection, document_id: &str) -> RepoResult<Vec<DocumentCheckpoint>> {
    let mut stmt = conn.prepare(&format!(
        "{CHECKPOINT_SELECT_SQL}
         WHERE document_id = ?1
         ORDER BY sequence_order ASC;"
    ))?;
    let mut rows = stmt.query([document_id])?;
    let mut checkpoints = Vec::new();
    while let Some(row) = rows.next()? {
        checkpoints.push(parse_checkpoint_row(row)?);
    }
    Ok(checkpoints)
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<Document> {
    let id_text: String = row.get("id")?;
    let tracking_text: String = row.get("tracking_id")?;
    let tracking_id = TrackingId::parse(&tracking_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid tracking id `{tracking_text}` in documents.tracking_id"
        ))
    })?;

    let type_text: String = row.get("document_type_id")?;
    let route_text: String = row.get("route_id")?;
    let created_by = row
        .get::<_, Option<String>>("created_by")?
        .map(|value| parse_uuid(&value, "documents.created_by"))
        .transpose()?;

    let status_text: String = row.get("status")?;
    let status = DocumentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid document status `{status_text}` in documents.status"
        ))
    })?;
    let is_finalized = int_to_bool(row.get("is_finalized")?, "documents.is_finalized")?;
    if is_finalized != status.is_finalized() {
        return Err(RepoError::InvalidData(format!(
            "documents.is_finalized={is_finalized} disagrees with status `{status_text}` for {tracking_text}"
        )));
    }

    Ok(Document {
        id: parse_uuid(&id_text, "documents.id")?,
        tracking_id,
        document_type_id: parse_uuid(&type_text, "documents.document_type_id")?,
        route_id: parse_uuid(&route_text, "documents.route_id")?,
        document_date: row.get("document_date")?,
        exam_date: row.get("exam_date")?,
        status,
        current_location: row.get("current_location")?,
        is_finalized,
        notes: row.get("notes")?,
        created_by,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        checkpoints: Vec::new(),
    })
}

fn parse_checkpoint_row(row: &Row<'_>) -> RepoResult<DocumentCheckpoint> {
    let id_text: String = row.get("id")?;
    let document_text: String = row.get("document_id")?;
    let completed_by = row
        .get::<_, Option<String>>("completed_by")?
        .map(|value| parse_uuid(&value, "document_checkpoints.completed_by"))
        .transpose()?;

    Ok(DocumentCheckpoint {
        id: parse_uuid(&id_text, "document_checkpoints.id")?,
        document_id: parse_uuid(&document_text, "document_checkpoints.document_id")?,
        name: row.get("name")?,
        sequence_order: row.get("sequence_order")?,
        is_completed: int_to_bool(row.get("is_completed")?, "document_checkpoints.is_completed")?,
        completed_by,
        completed_at: row.get("completed_at")?,
        receiver_name: row.get("receiver_name")?,
        remarks: row.get("remarks")?,
    })
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{allocate_with_retry, escape_like, normalize_document_limit, InsertAttempt};
    use crate::model::tracking_id::TrackingId;
    use crate::repo::error::RepoError;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn retry_recovers_from_transient_collisions() {
        let id = Uuid::new_v4();
        let mut calls = 0;
        let created = allocate_with_retry(day(), 5, |attempt| {
            calls += 1;
            if attempt < 3 {
                Ok(InsertAttempt::TrackingIdTaken(TrackingId::first(day())))
            } else {
                Ok(InsertAttempt::Created(id))
            }
        })
        .unwrap();
        assert_eq!(created, id);
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_budget_exhaustion_is_reported() {
        let err = allocate_with_retry(day(), 4, |_| {
            Ok(InsertAttempt::TrackingIdTaken(TrackingId::first(day())))
        })
        .unwrap_err();
        assert!(matches!(
            err,
            RepoError::IdentifierExhaustion { attempts: 4, date } if date == day()
        ));
    }

    #[test]
    fn exhausted_day_fails_without_retrying() {
        let mut calls = 0;
        let err = allocate_with_retry(day(), 5, |_| {
            calls += 1;
            Ok(InsertAttempt::DayExhausted)
        })
        .unwrap_err();
        assert!(matches!(err, RepoError::IdentifierExhaustion { attempts: 1, .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn document_limit_defaults_and_clamps() {
        assert_eq!(normalize_document_limit(None), 50);
        assert_eq!(normalize_document_limit(Some(0)), 50);
        assert_eq!(normalize_document_limit(Some(20)), 20);
        assert_eq!(normalize_document_limit(Some(5000)), 200);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
