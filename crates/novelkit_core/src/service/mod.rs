//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into editor-level APIs.
//! - Own the pending-write queues that back debounced autosave.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod entity_service;
pub mod manuscript_service;
