//! Node/edge view of a relation collection for graph rendering.
//!
//! # Invariants
//! - One node per entity, in collection order.
//! - A mirrored pair `A -> B` / `B -> A` becomes a single edge; the reverse
//!   label is kept in `back_label`.
//! - Edges to entities outside the collection are left out.

use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::relation::RelationTypeTable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: EntityId,
    pub label: String,
    /// Role or world category, used for colouring.
    pub group: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: EntityId,
    pub to: EntityId,
    pub label: String,
    pub back_label: Option<String>,
    pub strength: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Builds the graph view of `entities`.
pub fn relation_graph(entities: &[Entity], table: &RelationTypeTable) -> RelationGraph {
    let known = entities
        .iter()
        .map(|entity| entity.id)
        .collect::<HashSet<_>>();

    let nodes = entities
        .iter()
        .map(|entity| GraphNode {
            id: entity.id,
            label: entity.name.clone(),
            group: entity.category.clone(),
            kind: entity.kind,
        })
        .collect();

    let mut edges: Vec<GraphEdge> = Vec::new();
    // (from, to, type label) -> index into `edges`
    let mut emitted = HashMap::new();
    for entity in entities {
        for edge in &entity.relations {
            if !known.contains(&edge.to_id) || edge.to_id == entity.id {
                continue;
            }
            let expected = table.mirror_type(edge.kind).label();
            if let Some(&index) = emitted.get(&(edge.to_id, entity.id, expected)) {
                let paired: &mut GraphEdge = &mut edges[index];
                if paired.back_label.is_none() {
                    paired.back_label = Some(edge.kind.label().to_string());
                    continue;
                }
            }
            emitted.insert((entity.id, edge.to_id, edge.kind.label()), edges.len());
            edges.push(GraphEdge {
                from: entity.id,
                to: edge.to_id,
                label: edge.kind.label().to_string(),
                back_label: None,
                strength: edge.strength,
            });
        }
    }

    RelationGraph { nodes, edges }
}
