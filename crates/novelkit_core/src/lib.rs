//! Core domain logic for NovelKit, a novel-writing assistant.
//! This crate is the single source of truth for manuscript and relation
//! graph invariants.

pub mod autosave;
pub mod book;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod relations;
pub mod repo;
pub mod search;
pub mod service;

pub use book::{assemble_book, chapter_heading, render_html, BookDocument};
pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{
    CharacterSheet, Entity, EntityId, EntityKind, EntityPatch, EntityValidationError,
};
pub use model::manuscript::{Chapter, ChapterId, Project, ProjectId, Scene, SceneId, ScenePatch};
pub use model::relation::{
    clamp_strength, Relation, RelationDraft, RelationDraftPatch, RelationType, RelationTypeTable,
};
pub use relations::editor::RelationEditor;
pub use relations::graph::{relation_graph, GraphEdge, GraphNode, RelationGraph};
pub use relations::sync::{RelationGraphSync, SyncError, SyncOutcome};
pub use repo::entity_repo::{EntityRepository, RelationUpdate, SqliteEntityRepository};
pub use repo::manuscript_repo::{ManuscriptRepository, SceneSource, SqliteManuscriptRepository};
pub use repo::{RepoError, RepoResult};
pub use search::mentions::{scan_project, scan_scenes, MentionCounts};
pub use service::entity_service::{EntityService, EntityServiceError};
pub use service::manuscript_service::{ManuscriptService, ManuscriptServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
