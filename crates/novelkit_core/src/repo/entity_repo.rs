//! Character/world-item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `entities` and their owned `relations` rows.
//! - Replace relation lists of several entities in one transaction, so a
//!   forward edge and its mirror are never persisted separately.
//!
//! # Invariants
//! - Write paths call `Entity::validate()` before SQL mutations.
//! - New entities are inserted without edges; relations only change
//!   through `replace_relations`.
//! - Relation order is preserved through the `slot` column.
//! - Deleting an entity removes every relation pointing at it (FK cascade).

use crate::model::entity::{Entity, EntityId, EntityKind, EntityPatch, EntityValidationError};
use crate::model::manuscript::ProjectId;
use crate::model::relation::{Relation, RelationType};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};

const ENTITY_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    kind,
    name,
    category,
    age,
    description
FROM entities";

/// New relation list for one owner, written as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationUpdate {
    pub owner_id: EntityId,
    pub relations: Vec<Relation>,
}

/// Repository interface for entity CRUD and relation persistence.
pub trait EntityRepository {
    fn create_entity(&self, entity: &Entity) -> RepoResult<EntityId>;
    fn get_entity(&self, id: EntityId) -> RepoResult<Option<Entity>>;
    /// Lists entities in creation order, optionally restricted to one kind.
    fn list_entities(
        &self,
        project_id: ProjectId,
        kind: Option<EntityKind>,
    ) -> RepoResult<Vec<Entity>>;
    /// Applies a field patch and returns the stored record.
    fn update_entity(&self, id: EntityId, patch: &EntityPatch) -> RepoResult<Entity>;
    fn delete_entity(&self, id: EntityId) -> RepoResult<()>;
    /// Replaces the relation lists of all given owners atomically.
    fn replace_relations(&mut self, updates: &[RelationUpdate]) -> RepoResult<()>;
}

/// SQLite-backed entity repository.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn create_entity(&self, entity: &Entity) -> RepoResult<EntityId> {
        entity.validate_new()?;

        self.conn.execute(
            "INSERT INTO entities (
                uuid,
                project_uuid,
                kind,
                name,
                category,
                age,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                entity.id.to_string(),
                entity.project_id.to_string(),
                entity.kind.as_str(),
                entity.name.as_str(),
                entity.category.as_str(),
                entity.age,
                entity.description.as_str(),
            ],
        )?;

        Ok(entity.id)
    }

    fn get_entity(&self, id: EntityId) -> RepoResult<Option<Entity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTITY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut entity = parse_entity_row(row)?;
            entity.relations = load_relations(&*self.conn, entity.id)?;
            return Ok(Some(entity));
        }
        Ok(None)
    }

    fn list_entities(
        &self,
        project_id: ProjectId,
        kind: Option<EntityKind>,
    ) -> RepoResult<Vec<Entity>> {
        let mut sql = format!("{ENTITY_SELECT_SQL} WHERE project_uuid = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(project_id.to_string())];

        if let Some(kind) = kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row(row)?);
        }
        for entity in &mut entities {
            entity.relations = load_relations(&*self.conn, entity.id)?;
        }
        Ok(entities)
    }

    fn update_entity(&self, id: EntityId, patch: &EntityPatch) -> RepoResult<Entity> {
        let mut entity = self
            .get_entity(id)?
            .ok_or(RepoError::not_found("entity", id))?;
        entity.apply(patch);
        entity.validate()?;

        self.conn.execute(
            "UPDATE entities
             SET
                name = ?1,
                category = ?2,
                age = ?3,
                description = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                entity.name.as_str(),
                entity.category.as_str(),
                entity.age,
                entity.description.as_str(),
                id.to_string(),
            ],
        )?;

        Ok(entity)
    }

    fn delete_entity(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM entities WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("entity", id));
        }
        Ok(())
    }

    fn replace_relations(&mut self, updates: &[RelationUpdate]) -> RepoResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for update in updates {
            if update
                .relations
                .iter()
                .any(|edge| edge.to_id == update.owner_id)
            {
                return Err(EntityValidationError::SelfRelation(update.owner_id).into());
            }
            let owner_text = update.owner_id.to_string();
            let changed = tx.execute(
                "UPDATE entities
                 SET updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                [owner_text.as_str()],
            )?;
            if changed == 0 {
                return Err(RepoError::not_found("entity", update.owner_id));
            }
            tx.execute(
                "DELETE FROM relations WHERE owner_uuid = ?1;",
                [owner_text.as_str()],
            )?;
            write_relations(&tx, update.owner_id, &update.relations)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn write_relations(conn: &Connection, owner_id: EntityId, relations: &[Relation]) -> RepoResult<()> {
    let owner_text = owner_id.to_string();
    let mut stmt = conn.prepare(
        "INSERT INTO relations (owner_uuid, slot, to_uuid, type, strength, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    for (slot, edge) in relations.iter().enumerate() {
        stmt.execute(params![
            owner_text.as_str(),
            slot as i64,
            edge.to_id.to_string(),
            edge.kind.label(),
            edge.strength,
            edge.notes.as_str(),
        ])?;
    }
    Ok(())
}

fn load_relations(conn: &Connection, owner_id: EntityId) -> RepoResult<Vec<Relation>> {
    let mut stmt = conn.prepare(
        "SELECT to_uuid, type, strength, notes
         FROM relations
         WHERE owner_uuid = ?1
         ORDER BY slot ASC;",
    )?;
    let mut rows = stmt.query([owner_id.to_string()])?;
    let mut relations = Vec::new();
    while let Some(row) = rows.next()? {
        let to_text: String = row.get("to_uuid")?;
        let type_text: String = row.get("type")?;
        let kind = RelationType::parse(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid relation type `{type_text}` in relations.type"))
        })?;
        relations.push(Relation {
            to_id: parse_uuid(&to_text, "relations.to_uuid")?,
            kind,
            strength: row.get("strength")?,
            notes: row.get("notes")?,
        });
    }
    Ok(relations)
}

fn parse_entity_row(row: &Row<'_>) -> RepoResult<Entity> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let kind_text: String = row.get("kind")?;
    let kind = EntityKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid entity kind `{kind_text}` in entities.kind"))
    })?;

    Ok(Entity {
        id: parse_uuid(&uuid_text, "entities.uuid")?,
        project_id: parse_uuid(&project_text, "entities.project_uuid")?,
        kind,
        name: row.get("name")?,
        category: row.get("category")?,
        age: row.get("age")?,
        description: row.get("description")?,
        relations: Vec::new(),
    })
}
