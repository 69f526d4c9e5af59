//! Bidirectional relation graph for characters and world items.
//!
//! # Responsibility
//! - Derive inverse edges from the relation type table.
//! - Persist relation edits together with their mirrors.
//! - Track draft edits and debounce relation saves per owner.
//! - Present a collection as nodes and edges for the graph view.
//!
//! # See also
//! - `model::relation` for the vocabulary and edge records.

pub mod editor;
pub mod graph;
pub mod mirror;
pub mod sync;
