//! Editable relation list for the currently selected entity.
//!
//! # Responsibility
//! - Hold the draft rows shown in the relation table.
//! - Turn row edits into pending relation saves, per owner.
//!
//! # Invariants
//! - Loading an entity's edges never queues a save.
//! - While any row lacks a target, no new save is queued for that owner.
//!   A save queued before the incomplete row was added stays queued.
//! - Selecting another entity keeps the previous owner's pending save.

use crate::autosave::PendingWrites;
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::relation::{RelationDraft, RelationDraftPatch};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RelationEditor {
    owner: Option<(EntityId, EntityKind)>,
    drafts: Vec<RelationDraft>,
    skip_next_change: bool,
    pending: PendingWrites<EntityId, Vec<RelationDraft>>,
}

impl RelationEditor {
    pub fn new(window: Duration) -> Self {
        Self {
            owner: None,
            drafts: Vec::new(),
            skip_next_change: false,
            pending: PendingWrites::new(window),
        }
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner.map(|(id, _)| id)
    }

    pub fn drafts(&self) -> &[RelationDraft] {
        &self.drafts
    }

    /// Hydrates the editor with `entity`'s stored edges.
    pub fn load(&mut self, entity: &Entity, now: Instant) {
        self.owner = Some((entity.id, entity.kind));
        self.skip_next_change = true;
        self.drafts = entity.relations.iter().map(|edge| edge.to_draft()).collect();
        self.on_drafts_changed(now);
    }

    /// Clears the selection; pending saves stay queued.
    pub fn unload(&mut self) {
        self.owner = None;
        self.drafts.clear();
        self.skip_next_change = false;
    }

    /// Appends a row targeting the first candidate other than the owner.
    pub fn add(&mut self, candidates: &[Entity], now: Instant) {
        let Some((owner_id, kind)) = self.owner else {
            return;
        };
        let target = candidates
            .iter()
            .find(|candidate| candidate.id != owner_id)
            .map(|candidate| candidate.id);
        self.drafts
            .push(RelationDraft::new(target, kind.default_relation_type()));
        self.on_drafts_changed(now);
    }

    /// Applies `patch` to row `index`. Returns `false` for unknown rows.
    pub fn edit(&mut self, index: usize, patch: RelationDraftPatch, now: Instant) -> bool {
        let Some(draft) = self.drafts.get_mut(index) else {
            return false;
        };
        draft.apply(patch);
        self.on_drafts_changed(now);
        true
    }

    pub fn remove(&mut self, index: usize, now: Instant) -> bool {
        if index >= self.drafts.len() {
            return false;
        }
        self.drafts.remove(index);
        self.on_drafts_changed(now);
        true
    }

    /// Reloads the active owner from `entity` unless it has unsaved edits
    /// or rows still lacking a target.
    ///
    /// Called after a save mirrored edges onto the active owner.
    pub fn refresh(&mut self, entity: &Entity, now: Instant) -> bool {
        if self.owner() != Some(entity.id)
            || self.pending.is_pending(entity.id)
            || !self.drafts.iter().all(RelationDraft::is_complete)
        {
            return false;
        }
        self.load(entity, now);
        true
    }

    /// Drops everything held for `owner_id`, e.g. after it was deleted.
    pub fn discard(&mut self, owner_id: EntityId) {
        self.pending.cancel(owner_id);
        if self.owner() == Some(owner_id) {
            self.unload();
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, owner_id: EntityId) -> bool {
        self.pending.is_pending(owner_id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    /// Saves whose quiet period elapsed by `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<(EntityId, Vec<RelationDraft>)> {
        self.pending.take_due(now)
    }

    /// Every queued save, used when leaving the editor.
    pub fn take_all(&mut self) -> Vec<(EntityId, Vec<RelationDraft>)> {
        self.pending.take_all()
    }

    /// Change detection after every mutation of `drafts`.
    fn on_drafts_changed(&mut self, now: Instant) {
        let Some((owner_id, _)) = self.owner else {
            return;
        };
        if self.skip_next_change {
            self.skip_next_change = false;
            return;
        }
        if !self.drafts.iter().all(RelationDraft::is_complete) {
            return;
        }
        self.pending.record(owner_id, self.drafts.clone(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::RelationEditor;
    use crate::model::entity::{Entity, EntityKind};
    use crate::model::relation::{Relation, RelationDraftPatch, RelationType};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    const WINDOW: Duration = Duration::from_millis(700);

    fn pair() -> (Entity, Entity) {
        let project = Uuid::new_v4();
        let mut anna = Entity::new(project, EntityKind::Character, "Anna");
        let ben = Entity::new(project, EntityKind::Character, "Ben");
        anna.relations = vec![Relation::new(ben.id, RelationType::Freund)];
        (anna, ben)
    }

    #[test]
    fn loading_does_not_queue_a_save() {
        let (anna, _) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);

        assert_eq!(editor.drafts().len(), 1);
        assert!(!editor.has_pending());
        assert!(editor.take_due(start + WINDOW * 2).is_empty());
    }

    #[test]
    fn first_edit_after_load_is_queued() {
        let (anna, _) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);

        let patch = RelationDraftPatch {
            strength_input: Some("7".to_string()),
            ..RelationDraftPatch::default()
        };
        assert!(editor.edit(0, patch, start + Duration::from_millis(10)));
        assert_eq!(editor.drafts()[0].strength, 5);
        assert!(editor.is_pending(anna.id));
    }

    #[test]
    fn incomplete_row_blocks_queueing() {
        let (anna, _) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);

        editor.add(&[anna.clone()], start);
        assert_eq!(editor.drafts()[1].to_id, None);
        assert!(!editor.has_pending());
    }

    #[test]
    fn incomplete_row_keeps_earlier_queued_save() {
        let (anna, _) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);

        let patch = RelationDraftPatch {
            strength_input: Some("5".to_string()),
            ..RelationDraftPatch::default()
        };
        assert!(editor.edit(0, patch, start));
        editor.add(&[anna.clone()], start + Duration::from_millis(50));
        assert_eq!(editor.drafts().len(), 2);
        assert!(editor.is_pending(anna.id));

        editor.unload();
        let flushed = editor.take_all();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].0, anna.id);
        assert_eq!(flushed[0].1.len(), 1);
        assert_eq!(flushed[0].1[0].strength, 5);
    }

    #[test]
    fn refresh_keeps_rows_without_target() {
        let (anna, _) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);
        editor.add(&[anna.clone()], start);

        assert!(!editor.refresh(&anna, start));
        assert_eq!(editor.drafts().len(), 2);
    }

    #[test]
    fn switching_owner_keeps_pending_save() {
        let (anna, ben) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&anna, start);
        editor.remove(0, start);
        assert!(editor.is_pending(anna.id));

        editor.load(&ben, start + Duration::from_millis(100));
        assert_eq!(editor.owner(), Some(ben.id));
        let due = editor.take_due(start + WINDOW);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, anna.id);
        assert!(due[0].1.is_empty());
    }

    #[test]
    fn refresh_skips_owner_with_unsaved_rows() {
        let (anna, ben) = pair();
        let start = Instant::now();
        let mut editor = RelationEditor::new(WINDOW);
        editor.load(&ben, start);
        assert!(editor.refresh(&ben, start));

        editor.add(&[anna.clone()], start);
        assert!(editor.is_pending(ben.id));
        assert!(!editor.refresh(&ben, start));
        assert_eq!(editor.drafts().len(), 1);

        editor.discard(ben.id);
        assert!(!editor.has_pending());
        assert_eq!(editor.owner(), None);
    }
}
