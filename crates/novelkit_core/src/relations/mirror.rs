//! Inverse-edge derivation for the relation graph.
//!
//! # Responsibility
//! - Derive the counterpart edge for one forward edge.
//! - Plan the full set of relation-list writes caused by one owner edit.
//!
//! # Invariants
//! - For each counterpart `C` of owner `O`, the edges `C -> O` after the plan
//!   are exactly the mirrors of the edges `O -> C`, in the same order.
//! - Edges of `C` pointing elsewhere keep their relative order.
//! - Counterparts whose list would not change are not part of the plan.

use crate::model::entity::{Entity, EntityId};
use crate::model::relation::{Relation, RelationTypeTable};
use crate::repo::entity_repo::RelationUpdate;
use std::collections::BTreeSet;

/// Returns the edge `edge.to_id -> owner_id` that mirrors `owner_id -> edge.to_id`.
///
/// Strength and notes are shared by both directions.
pub fn mirror(owner_id: EntityId, edge: &Relation, table: &RelationTypeTable) -> Relation {
    Relation {
        to_id: owner_id,
        kind: table.mirror_type(edge.kind),
        strength: edge.strength,
        notes: edge.notes.clone(),
    }
}

/// Plans the writes for replacing `owner_id`'s edges with `edges`.
///
/// The owner's own update is always first; counterpart updates follow in
/// `entities` order and only when their list actually changes.
pub fn plan_mirrored_update(
    owner_id: EntityId,
    edges: &[Relation],
    entities: &[Entity],
    table: &RelationTypeTable,
) -> Vec<RelationUpdate> {
    let mut counterparts = BTreeSet::new();
    if let Some(owner) = entities.iter().find(|entity| entity.id == owner_id) {
        counterparts.extend(owner.relations.iter().map(|edge| edge.to_id));
    }
    counterparts.extend(edges.iter().map(|edge| edge.to_id));

    let mut updates = vec![RelationUpdate {
        owner_id,
        relations: edges.to_vec(),
    }];

    for counterpart in entities
        .iter()
        .filter(|entity| entity.id != owner_id && counterparts.contains(&entity.id))
    {
        let mirrors = edges
            .iter()
            .filter(|edge| edge.to_id == counterpart.id)
            .map(|edge| mirror(owner_id, edge, table))
            .collect::<Vec<_>>();
        let next = splice_mirrors(&counterpart.relations, owner_id, mirrors);
        if next != counterpart.relations {
            updates.push(RelationUpdate {
                owner_id: counterpart.id,
                relations: next,
            });
        }
    }

    updates
}

/// Replaces every edge pointing at `owner_id` with `mirrors`, inserted where
/// the first such edge was (or appended when there was none).
fn splice_mirrors(current: &[Relation], owner_id: EntityId, mirrors: Vec<Relation>) -> Vec<Relation> {
    let mut next = Vec::with_capacity(current.len() + mirrors.len());
    let mut mirrors = Some(mirrors);
    for edge in current {
        if edge.to_id == owner_id {
            if let Some(pending) = mirrors.take() {
                next.extend(pending);
            }
        } else {
            next.push(edge.clone());
        }
    }
    if let Some(pending) = mirrors {
        next.extend(pending);
    }
    next
}
