//! Domain model for tracked documents and their reference data.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Hold the pure rules (status derivation, completion percentage,
//!   tracking id format) so they stay testable without a database.
//!
//! # Invariants
//! - Every stored entity is identified by a stable UUID.
//! - `Document::is_finalized` mirrors `DocumentStatus::Finalized`.

pub mod catalog;
pub mod document;
pub mod tracking_id;
pub mod user;
pub mod validation;
