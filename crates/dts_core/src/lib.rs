//! Core domain logic for the document tracking system.
//! This crate is the single source of truth for tracking id allocation and
//! document status invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::catalog::{
    CheckpointTemplate, CheckpointTemplateId, DocumentType, DocumentTypeId, Route, RouteId,
};
pub use model::document::{
    completion_percentage, recompute_status, Document, DocumentCheckpoint, DocumentCheckpointId,
    DocumentId, DocumentStatus,
};
pub use model::tracking_id::TrackingId;
pub use model::user::{NewUser, User, UserId, UserRole};
pub use model::validation::ValidationError;
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::document_repo::{
    DocumentListQuery, DocumentRepository, SqliteDocumentRepository,
};
pub use repo::error::{ReferenceIssue, RepoError, RepoResult};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use service::catalog_service::CatalogService;
pub use service::document_service::{CreateDocumentRequest, DocumentService};
pub use service::error::{ServiceError, ServiceResult};
pub use service::user_service::UserService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
