//! Domain model for manuscripts and the character/world relation graph.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep manuscript records and graph nodes free of storage concerns.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Relation edges are owned by their source entity.

pub mod entity;
pub mod manuscript;
pub mod relation;
