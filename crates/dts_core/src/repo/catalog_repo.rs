//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist document types, their checkpoint templates, and routes.
//! - Enforce protect-on-delete for types and routes still in use.
//!
//! # Invariants
//! - Type/route listings are ordered by name, templates by sequence.
//! - Deleting a type cascades its templates and nothing else; documents
//!   hold their own checkpoint copies.

use crate::model::catalog::{
    CheckpointTemplate, CheckpointTemplateId, DocumentType, DocumentTypeId, NewCheckpointTemplate,
    NewDocumentType, NewRoute, Route, RouteId,
};
use crate::repo::error::{
    is_foreign_key_violation, unique_violation, ReferenceIssue, RepoError, RepoResult,
};
use crate::repo::schema::{
    bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid, TableLayout,
};
use crate::repo::user_repo::user_exists;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const DOCUMENT_TYPE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    is_active,
    created_by,
    created_at,
    updated_at
FROM document_types";

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id,
    document_type_id,
    name,
    sequence_order,
    description
FROM checkpoint_templates";

const ROUTE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    is_active,
    created_at
FROM routes";

const CATALOG_TABLES: &[TableLayout] = &[
    (
        "document_types",
        &[
            "id",
            "name",
            "description",
            "is_active",
            "created_by",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "checkpoint_templates",
        &[
            "id",
            "document_type_id",
            "name",
            "sequence_order",
            "description",
        ],
    ),
    (
        "routes",
        &["id", "name", "description", "is_active", "created_at"],
    ),
    ("documents", &["document_type_id", "route_id"]),
];

/// Repository interface for catalog reference data.
pub trait CatalogRepository {
    fn create_document_type(&self, document_type: &NewDocumentType) -> RepoResult<DocumentType>;
    fn get_document_type(&self, id: DocumentTypeId) -> RepoResult<Option<DocumentType>>;
    /// Lists types by name; inactive ones only when asked.
    fn list_document_types(&self, include_inactive: bool) -> RepoResult<Vec<DocumentType>>;
    /// Flips the active flag and stamps `updated_at` with `now_ms`.
    fn set_document_type_active(
        &self,
        id: DocumentTypeId,
        is_active: bool,
        now_ms: i64,
    ) -> RepoResult<()>;
    /// Deletes a type and its templates unless documents reference it.
    fn delete_document_type(&self, id: DocumentTypeId) -> RepoResult<()>;

    fn add_checkpoint_template(
        &self,
        template: &NewCheckpointTemplate,
    ) -> RepoResult<CheckpointTemplate>;
    /// Lists templates of one type in sequence order.
    fn list_checkpoint_templates(
        &self,
        document_type_id: DocumentTypeId,
    ) -> RepoResult<Vec<CheckpointTemplate>>;
    fn remove_checkpoint_template(&self, id: CheckpointTemplateId) -> RepoResult<()>;

    fn create_route(&self, route: &NewRoute) -> RepoResult<Route>;
    fn get_route(&self, id: RouteId) -> RepoResult<Option<Route>>;
    fn list_routes(&self, include_inactive: bool) -> RepoResult<Vec<Route>>;
    fn set_route_active(&self, id: RouteId, is_active: bool) -> RepoResult<()>;
    /// Deletes a route unless documents reference it.
    fn delete_route(&self, id: RouteId) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, CATALOG_TABLES)?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_document_type(&self, document_type: &NewDocumentType) -> RepoResult<DocumentType> {
        if let Some(creator) = document_type.created_by {
            if !user_exists(self.conn, creator)? {
                return Err(RepoError::Reference {
                    entity: "user",
                    id: creator,
                    issue: ReferenceIssue::Missing,
                });
            }
        }

        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO document_types (id, name, description, created_by)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    document_type.name.as_str(),
                    document_type.description.as_str(),
                    document_type.created_by.map(|value| value.to_string()),
                ],
            )
            .map_err(|err| match unique_violation(&err) {
                Some(_) => RepoError::DuplicateName {
                    entity: "document type",
                    name: document_type.name.clone(),
                },
                None => err.into(),
            })?;

        self.get_document_type(id)?.ok_or(RepoError::NotFound {
            entity: "document type",
            id,
        })
    }

    fn get_document_type(&self, id: DocumentTypeId) -> RepoResult<Option<DocumentType>> {
        self.conn
            .query_row(
                &format!("{DOCUMENT_TYPE_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_document_type_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_document_types(&self, include_inactive: bool) -> RepoResult<Vec<DocumentType>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_TYPE_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_document_type_row(row)?);
        }
        Ok(items)
    }

    fn set_document_type_active(
        &self,
        id: DocumentTypeId,
        is_active: bool,
        now_ms: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE document_types
             SET is_active = ?2,
                 updated_at = ?3
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(is_active), now_ms],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "document type",
                id,
            });
        }
        Ok(())
    }

    fn delete_document_type(&self, id: DocumentTypeId) -> RepoResult<()> {
        delete_protected(
            self.conn,
            "document type",
            id,
            "SELECT COUNT(*) FROM documents WHERE document_type_id = ?1;",
            "DELETE FROM document_types WHERE id = ?1;",
        )
    }

    fn add_checkpoint_template(
        &self,
        template: &NewCheckpointTemplate,
    ) -> RepoResult<CheckpointTemplate> {
        if self.get_document_type(template.document_type_id)?.is_none() {
            return Err(RepoError::Reference {
                entity: "document type",
                id: template.document_type_id,
                issue: ReferenceIssue::Missing,
            });
        }

        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO checkpoint_templates (
                    id,
                    document_type_id,
                    name,
                    sequence_order,
                    description
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.to_string(),
                    template.document_type_id.to_string(),
                    template.name.as_str(),
                    template.sequence_order,
                    template.description.as_str(),
                ],
            )
            .map_err(|err| match unique_violation(&err) {
                Some(_) => RepoError::DuplicateSequence {
                    entity: "checkpoint template",
                    owner_id: template.document_type_id,
                    sequence_order: template.sequence_order,
                },
                None => err.into(),
            })?;

        Ok(CheckpointTemplate {
            id,
            document_type_id: template.document_type_id,
            name: template.name.clone(),
            sequence_order: template.sequence_order,
            description: template.description.clone(),
        })
    }

    fn list_checkpoint_templates(
        &self,
        document_type_id: DocumentTypeId,
    ) -> RepoResult<Vec<CheckpointTemplate>> {
        list_templates(self.conn, document_type_id)
    }

    fn remove_checkpoint_template(&self, id: CheckpointTemplateId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM checkpoint_templates WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "checkpoint template",
                id,
            });
        }
        Ok(())
    }

    fn create_route(&self, route: &NewRoute) -> RepoResult<Route> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO routes (id, name, description) VALUES (?1, ?2, ?3);",
                params![id.to_string(), route.name.as_str(), route.description.as_str()],
            )
            .map_err(|err| match unique_violation(&err) {
                Some(_) => RepoError::DuplicateName {
                    entity: "route",
                    name: route.name.clone(),
                },
                None => err.into(),
            })?;

        self.get_route(id)?
            .ok_or(RepoError::NotFound { entity: "route", id })
    }

    fn get_route(&self, id: RouteId) -> RepoResult<Option<Route>> {
        self.conn
            .query_row(
                &format!("{ROUTE_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_route_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_routes(&self, include_inactive: bool) -> RepoResult<Vec<Route>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ROUTE_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_route_row(row)?);
        }
        Ok(items)
    }

    fn set_route_active(&self, id: RouteId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE routes SET is_active = ?2 WHERE id = ?1;",
            params![id.to_string(), bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "route", id });
        }
        Ok(())
    }

    fn delete_route(&self, id: RouteId) -> RepoResult<()> {
        delete_protected(
            self.conn,
            "route",
            id,
            "SELECT COUNT(*) FROM documents WHERE route_id = ?1;",
            "DELETE FROM routes WHERE id = ?1;",
        )
    }
}

/// Lists templates of one type in clone order.
pub(crate) fn list_templates(
    conn: &Connection,
    document_type_id: DocumentTypeId,
) -> RepoResult<Vec<CheckpointTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "{TEMPLATE_SELECT_SQL}
         WHERE document_type_id = ?1
         ORDER BY sequence_order ASC;"
    ))?;
    let mut rows = stmt.query([document_type_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_template_row(row)?);
    }
    Ok(items)
}

/// Deletes one row guarded by a referencing-document count.
///
/// The count check gives a precise error; the `ON DELETE RESTRICT` foreign
/// key still rejects a document inserted between the check and the delete.
fn delete_protected(
    conn: &Connection,
    entity: &'static str,
    id: Uuid,
    count_sql: &str,
    delete_sql: &str,
) -> RepoResult<()> {
    let count: i64 = conn.query_row(count_sql, [id.to_string()], |row| row.get(0))?;
    if count > 0 {
        let referencing_documents = count.unsigned_abs();
        info!(
            "event=catalog_delete module=repo status=blocked entity={} id={} referencing_documents={}",
            entity.replace(' ', "_"),
            id,
            referencing_documents
        );
        return Err(RepoError::ProtectedReference {
            entity,
            id,
            referencing_documents,
        });
    }

    let changed = conn.execute(delete_sql, [id.to_string()]).map_err(|err| {
        if is_foreign_key_violation(&err) {
            RepoError::ProtectedReference {
                entity,
                id,
                referencing_documents: 1,
            }
        } else {
            err.into()
        }
    })?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }

    info!(
        "event=catalog_delete module=repo status=ok entity={} id={}",
        entity.replace(' ', "_"),
        id
    );
    Ok(())
}

pub(crate) fn parse_document_type_row(row: &Row<'_>) -> RepoResult<DocumentType> {
    let id_text: String = row.get("id")?;
    let created_by = row
        .get::<_, Option<String>>("created_by")?
        .map(|value| parse_uuid(&value, "document_types.created_by"))
        .transpose()?;

    Ok(DocumentType {
        id: parse_uuid(&id_text, "document_types.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_active: int_to_bool(row.get("is_active")?, "document_types.is_active")?,
        created_by,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<CheckpointTemplate> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("document_type_id")?;
    Ok(CheckpointTemplate {
        id: parse_uuid(&id_text, "checkpoint_templates.id")?,
        document_type_id: parse_uuid(&type_text, "checkpoint_templates.document_type_id")?,
        name: row.get("name")?,
        sequence_order: row.get("sequence_order")?,
        description: row.get("description")?,
    })
}

pub(crate) fn parse_route_row(row: &Row<'_>) -> RepoResult<Route> {
    let id_text: String = row.get("id")?;
    Ok(Route {
        id: parse_uuid(&id_text, "routes.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_active: int_to_bool(row.get("is_active")?, "routes.is_active")?,
        created_at: row.get("created_at")?,
    })
}
