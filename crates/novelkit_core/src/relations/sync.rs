//! Persisting relation edits with bidirectional consistency.
//!
//! # Responsibility
//! - Validate an edited edge list before anything is written.
//! - Write the owner's edges and all mirrored edges in one repository batch.
//! - Return the refreshed entity collection after a successful write.
//!
//! # Invariants
//! - An edge list containing an unset target causes no repository call.
//! - Targets must be other entities of the owner's project and kind.
//! - Reapplying an unchanged list leaves strength and notes untouched.

use crate::model::entity::{Entity, EntityId};
use crate::model::relation::{Relation, RelationDraft, RelationTypeTable};
use crate::relations::mirror::plan_mirrored_update;
use crate::repo::entity_repo::EntityRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from relation save attempts.
#[derive(Debug)]
pub enum SyncError {
    /// Draft at `index` has no target yet; nothing was written.
    IncompleteEdge { index: usize },
    /// Owner entity does not exist.
    OwnerNotFound(EntityId),
    /// An edge points at its own owner.
    SelfRelation(EntityId),
    /// An edge points at an entity outside the owner's project/kind.
    UnknownTarget(EntityId),
    Repo(RepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteEdge { index } => {
                write!(f, "relation #{index} has no target; save skipped")
            }
            Self::OwnerNotFound(id) => write!(f, "relation owner not found: {id}"),
            Self::SelfRelation(id) => write!(f, "entity {id} must not relate to itself"),
            Self::UnknownTarget(id) => write!(f, "relation target not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of a successful relation save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Owner as stored after the write.
    pub owner: Entity,
    /// Fresh collection of all entities of the owner's project and kind.
    pub entities: Vec<Entity>,
    /// Entities whose relation list was written, owner first.
    pub written: Vec<EntityId>,
}

/// Applies relation edits and keeps the inverse edges in lockstep.
#[derive(Debug, Clone, Default)]
pub struct RelationGraphSync {
    table: RelationTypeTable,
}

impl RelationGraphSync {
    pub fn new(table: RelationTypeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RelationTypeTable {
        &self.table
    }

    /// Persists `drafts` as the new edge list of `owner_id`.
    ///
    /// # Errors
    /// - `IncompleteEdge` before any repository access when a target is unset.
    /// - `SelfRelation`/`UnknownTarget` when a target is invalid.
    /// - `Repo` when reading or the atomic write fails.
    pub fn apply_relation_edit<R: EntityRepository + ?Sized>(
        &self,
        repo: &mut R,
        owner_id: EntityId,
        drafts: &[RelationDraft],
    ) -> Result<SyncOutcome, SyncError> {
        let edges = complete_edges(drafts)?;
        let started_at = Instant::now();

        let owner = repo
            .get_entity(owner_id)?
            .ok_or(SyncError::OwnerNotFound(owner_id))?;
        let entities = repo.list_entities(owner.project_id, Some(owner.kind))?;
        validate_targets(owner_id, &edges, &entities)?;

        let updates = plan_mirrored_update(owner_id, &edges, &entities, &self.table);
        let written = updates
            .iter()
            .map(|update| update.owner_id)
            .collect::<Vec<_>>();
        if let Err(err) = repo.replace_relations(&updates) {
            error!(
                "event=relations_save module=relations status=error owner={} edges={} error={}",
                owner_id,
                edges.len(),
                err
            );
            return Err(err.into());
        }

        let entities = repo.list_entities(owner.project_id, Some(owner.kind))?;
        let owner = entities
            .iter()
            .find(|entity| entity.id == owner_id)
            .cloned()
            .ok_or(SyncError::OwnerNotFound(owner_id))?;

        info!(
            "event=relations_save module=relations status=ok owner={} edges={} mirrored={} duration_ms={}",
            owner_id,
            edges.len(),
            written.len() - 1,
            started_at.elapsed().as_millis()
        );

        Ok(SyncOutcome {
            owner,
            entities,
            written,
        })
    }
}

fn complete_edges(drafts: &[RelationDraft]) -> Result<Vec<Relation>, SyncError> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| draft.complete().ok_or(SyncError::IncompleteEdge { index }))
        .collect()
}

fn validate_targets(
    owner_id: EntityId,
    edges: &[Relation],
    entities: &[Entity],
) -> Result<(), SyncError> {
    let known = entities
        .iter()
        .map(|entity| entity.id)
        .collect::<HashSet<_>>();
    for edge in edges {
        if edge.to_id == owner_id {
            return Err(SyncError::SelfRelation(owner_id));
        }
        if !known.contains(&edge.to_id) {
            return Err(SyncError::UnknownTarget(edge.to_id));
        }
    }
    Ok(())
}
