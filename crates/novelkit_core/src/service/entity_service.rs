//! Character and world-item use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/delete for entities with defaults.
//! - Queue debounced field edits and relation edits per entity.
//! - Route relation saves through `RelationGraphSync` so mirrors stay in step.
//!
//! # Invariants
//! - Selecting another entity never cancels a pending write of the previous one.
//! - Deleting an entity discards its pending writes.
//! - After a relation save, the active editor rows are reloaded when the
//!   save touched the active entity and it has no unsaved rows.

use crate::autosave::{flush_with, FlushSummary, PendingWrites};
use crate::config::CoreConfig;
use crate::model::entity::{
    CharacterSheet, Entity, EntityId, EntityKind, EntityPatch, EntityValidationError,
    DEFAULT_CHARACTER_NAME, DEFAULT_WORLD_ITEM_NAME,
};
use crate::model::manuscript::ProjectId;
use crate::model::relation::{RelationDraft, RelationTypeTable};
use crate::relations::editor::RelationEditor;
use crate::relations::graph::{relation_graph, RelationGraph};
use crate::relations::sync::{RelationGraphSync, SyncError, SyncOutcome};
use crate::repo::entity_repo::EntityRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for entity use-cases.
#[derive(Debug)]
pub enum EntityServiceError {
    EntityNotFound(EntityId),
    Validation(EntityValidationError),
    Repo(RepoError),
}

impl Display for EntityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityNotFound(id) => write!(f, "entity not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EntityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::EntityNotFound(_) => None,
        }
    }
}

impl From<RepoError> for EntityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { record: "entity", id } => Self::EntityNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type EntityResult<T> = Result<T, EntityServiceError>;

/// Use-case service over an entity repository.
pub struct EntityService<R: EntityRepository> {
    repo: R,
    sync: RelationGraphSync,
    field_edits: PendingWrites<EntityId, EntityPatch>,
    editor: RelationEditor,
}

impl<R: EntityRepository> EntityService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, &CoreConfig::default(), RelationTypeTable::standard())
    }

    pub fn with_config(repo: R, config: &CoreConfig, table: RelationTypeTable) -> Self {
        Self {
            repo,
            sync: RelationGraphSync::new(table),
            field_edits: PendingWrites::new(config.field_debounce()),
            editor: RelationEditor::new(config.relation_debounce()),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn editor(&self) -> &RelationEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut RelationEditor {
        &mut self.editor
    }

    /// Creates a character named "Neuer Charakter".
    pub fn create_character(&self, project_id: ProjectId) -> EntityResult<Entity> {
        self.create(Entity::new(
            project_id,
            EntityKind::Character,
            DEFAULT_CHARACTER_NAME,
        ))
    }

    /// Creates a world item named "Neues Element" in category "Allgemein".
    pub fn create_world_item(&self, project_id: ProjectId) -> EntityResult<Entity> {
        self.create(Entity::new(
            project_id,
            EntityKind::WorldItem,
            DEFAULT_WORLD_ITEM_NAME,
        ))
    }

    /// Creates a character from a completed sheet in a single write.
    pub fn create_from_sheet(
        &self,
        project_id: ProjectId,
        sheet: &CharacterSheet,
    ) -> EntityResult<Entity> {
        let entity = sheet
            .to_entity(project_id)
            .map_err(EntityServiceError::Validation)?;
        self.create(entity)
    }

    /// Inserts `entity`, which must not carry relations yet.
    pub fn create(&self, entity: Entity) -> EntityResult<Entity> {
        entity
            .validate_new()
            .map_err(EntityServiceError::Validation)?;
        self.repo.create_entity(&entity)?;
        info!(
            "event=entity_create module=service status=ok entity={} kind={}",
            entity.id,
            entity.kind.as_str()
        );
        Ok(entity)
    }

    pub fn get_entity(&self, id: EntityId) -> EntityResult<Entity> {
        self.repo
            .get_entity(id)?
            .ok_or(EntityServiceError::EntityNotFound(id))
    }

    pub fn list_entities(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
    ) -> EntityResult<Vec<Entity>> {
        Ok(self.repo.list_entities(project_id, Some(kind))?)
    }

    /// Nodes and edges of one kind's relation graph within a project.
    pub fn relation_graph(
        &self,
        project_id: ProjectId,
        kind: EntityKind,
    ) -> EntityResult<RelationGraph> {
        let entities = self.list_entities(project_id, kind)?;
        Ok(relation_graph(&entities, self.sync.table()))
    }

    /// Writes `patch` now and returns the stored entity.
    ///
    /// On error nothing was written; reverting local edits is up to the caller.
    pub fn update_entity(&self, id: EntityId, patch: &EntityPatch) -> EntityResult<Entity> {
        Ok(self.repo.update_entity(id, patch)?)
    }

    pub fn delete_entity(&mut self, id: EntityId) -> EntityResult<()> {
        self.field_edits.cancel(id);
        self.editor.discard(id);
        self.repo.delete_entity(id)?;
        info!("event=entity_delete module=service status=ok entity={id}");
        Ok(())
    }

    /// Persists `drafts` as the edge list of `owner_id`, mirrored.
    pub fn save_relations(
        &mut self,
        owner_id: EntityId,
        drafts: &[RelationDraft],
    ) -> Result<SyncOutcome, SyncError> {
        self.sync
            .apply_relation_edit(&mut self.repo, owner_id, drafts)
    }

    /// Makes `id` the entity shown in the relation editor.
    pub fn select(&mut self, id: EntityId, now: Instant) -> EntityResult<Entity> {
        let entity = self.get_entity(id)?;
        self.editor.load(&entity, now);
        Ok(entity)
    }

    /// Queues a field edit; it is written once the field window elapses.
    pub fn edit_fields(&mut self, id: EntityId, patch: EntityPatch, now: Instant) {
        if patch.is_empty() {
            return;
        }
        self.field_edits.record(id, patch, now);
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.field_edits.is_empty() || self.editor.has_pending()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.field_edits.next_deadline(), self.editor.next_deadline()) {
            (Some(fields), Some(relations)) => Some(fields.min(relations)),
            (fields, relations) => fields.or(relations),
        }
    }

    /// Writes every field and relation edit that became due by `now`.
    pub fn flush_due(&mut self, now: Instant) -> FlushSummary<EntityId> {
        let fields = self.field_edits.take_due(now);
        let relations = self.editor.take_due(now);
        self.flush(fields, relations, now)
    }

    /// Writes every queued edit regardless of timing.
    pub fn flush_all(&mut self, now: Instant) -> FlushSummary<EntityId> {
        let fields = self.field_edits.take_all();
        let relations = self.editor.take_all();
        self.flush(fields, relations, now)
    }

    fn flush(
        &mut self,
        fields: Vec<(EntityId, EntityPatch)>,
        relations: Vec<(EntityId, Vec<RelationDraft>)>,
        now: Instant,
    ) -> FlushSummary<EntityId> {
        let repo = &self.repo;
        let mut summary = flush_with(fields, |id, patch| repo.update_entity(id, &patch));

        let active = self.editor.owner();
        let mut touched_active = None;
        let sync = &self.sync;
        let repo = &mut self.repo;
        let relation_summary = flush_with(relations, |owner_id, drafts| {
            let outcome = sync.apply_relation_edit(&mut *repo, owner_id, &drafts)?;
            if let Some(active) = active.filter(|id| outcome.written.contains(id)) {
                touched_active = outcome
                    .entities
                    .iter()
                    .find(|entity| entity.id == active)
                    .cloned();
            }
            Ok::<_, SyncError>(outcome.written.len())
        });

        if let Some(entity) = touched_active {
            self.editor.refresh(&entity, now);
        }

        summary.saved.extend(relation_summary.saved);
        summary.failed.extend(relation_summary.failed);
        summary
    }
}
