//! Repository layer: SQLite persistence for catalog, documents and users.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL, transactions and constraint translation inside this layer.
//!
//! # Invariants
//! - Multi-row writes (document creation, checkpoint completion) run inside
//!   one `BEGIN IMMEDIATE` transaction.
//! - SQLite constraint failures surface as semantic `RepoError` variants,
//!   never as raw driver errors.

pub mod catalog_repo;
pub mod document_repo;
pub mod error;
mod schema;
pub mod user_repo;
