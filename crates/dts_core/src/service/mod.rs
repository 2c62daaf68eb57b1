//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Normalize request input and own the clock for time-stamped writes.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod catalog_service;
pub mod document_service;
pub mod error;
pub mod user_service;
