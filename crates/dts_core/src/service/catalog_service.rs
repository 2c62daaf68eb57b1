//! Catalog use-case service.
//!
//! # Responsibility
//! - Build normalized write models for types, templates and routes.
//! - Expose catalog reads and protect-on-delete operations.

use crate::clock::{Clock, SystemClock};
use crate::model::catalog::{
    CheckpointTemplate, CheckpointTemplateId, DocumentType, DocumentTypeId, NewCheckpointTemplate,
    NewDocumentType, NewRoute, Route, RouteId,
};
use crate::model::user::UserId;
use crate::repo::catalog_repo::CatalogRepository;
use crate::service::error::ServiceResult;
use log::info;

/// Catalog service facade.
pub struct CatalogService<R: CatalogRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: CatalogRepository> CatalogService<R, SystemClock> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: CatalogRepository, C: Clock> CatalogService<R, C> {
    /// Creates service with an explicit time source for `updated_at` stamps.
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Registers a new document type with no templates yet.
    pub fn create_document_type(
        &self,
        name: &str,
        description: &str,
        created_by: Option<UserId>,
    ) -> ServiceResult<DocumentType> {
        let document_type = NewDocumentType::new(name, description, created_by)?;
        let created = self.repo.create_document_type(&document_type)?;
        info!(
            "event=catalog_create module=service status=ok entity=document_type id={}",
            created.id
        );
        Ok(created)
    }

    pub fn get_document_type(&self, id: DocumentTypeId) -> ServiceResult<Option<DocumentType>> {
        Ok(self.repo.get_document_type(id)?)
    }

    pub fn list_document_types(&self, include_inactive: bool) -> ServiceResult<Vec<DocumentType>> {
        Ok(self.repo.list_document_types(include_inactive)?)
    }

    /// Inactive types stay readable but reject new documents.
    pub fn set_document_type_active(
        &self,
        id: DocumentTypeId,
        is_active: bool,
    ) -> ServiceResult<()> {
        Ok(self
            .repo
            .set_document_type_active(id, is_active, self.clock.now_ms())?)
    }

    /// Deletes a type and its templates; blocked while documents use it.
    pub fn delete_document_type(&self, id: DocumentTypeId) -> ServiceResult<()> {
        Ok(self.repo.delete_document_type(id)?)
    }

    /// Appends one template at `sequence_order` under a type.
    pub fn add_checkpoint_template(
        &self,
        document_type_id: DocumentTypeId,
        name: &str,
        sequence_order: i64,
        description: &str,
    ) -> ServiceResult<CheckpointTemplate> {
        let template =
            NewCheckpointTemplate::new(document_type_id, name, sequence_order, description)?;
        Ok(self.repo.add_checkpoint_template(&template)?)
    }

    pub fn list_checkpoint_templates(
        &self,
        document_type_id: DocumentTypeId,
    ) -> ServiceResult<Vec<CheckpointTemplate>> {
        Ok(self.repo.list_checkpoint_templates(document_type_id)?)
    }

    /// Removes a template. Checkpoints already cloned into documents stay.
    pub fn remove_checkpoint_template(&self, id: CheckpointTemplateId) -> ServiceResult<()> {
        Ok(self.repo.remove_checkpoint_template(id)?)
    }

    pub fn create_route(&self, name: &str, description: &str) -> ServiceResult<Route> {
        let route = NewRoute::new(name, description)?;
        let created = self.repo.create_route(&route)?;
        info!(
            "event=catalog_create module=service status=ok entity=route id={}",
            created.id
        );
        Ok(created)
    }

    pub fn get_route(&self, id: RouteId) -> ServiceResult<Option<Route>> {
        Ok(self.repo.get_route(id)?)
    }

    pub fn list_routes(&self, include_inactive: bool) -> ServiceResult<Vec<Route>> {
        Ok(self.repo.list_routes(include_inactive)?)
    }

    pub fn set_route_active(&self, id: RouteId, is_active: bool) -> ServiceResult<()> {
        Ok(self.repo.set_route_active(id, is_active)?)
    }

    /// Deletes a route; blocked while documents use it.
    pub fn delete_route(&self, id: RouteId) -> ServiceResult<()> {
        Ok(self.repo.delete_route(id)?)
    }
}
