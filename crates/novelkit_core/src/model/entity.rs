//! Character and world-item domain model.
//!
//! # Responsibility
//! - Define the node type of the relation graph (`Entity`).
//! - Provide partial-update payloads used by debounced field edits.
//! - Turn a filled-in character sheet into a new character.
//!
//! # Invariants
//! - `name` is never blank after validation.
//! - `relations` never contains an edge pointing at the owning entity.
//! - `age` is only meaningful for `EntityKind::Character`.

use crate::model::manuscript::ProjectId;
use crate::model::relation::{Relation, RelationType};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type EntityId = Uuid;

pub const DEFAULT_CHARACTER_NAME: &str = "Neuer Charakter";
pub const DEFAULT_WORLD_ITEM_NAME: &str = "Neues Element";
pub const DEFAULT_WORLD_CATEGORY: &str = "Allgemein";
pub const DEFAULT_CHARACTER_ROLE: &str = "Protagonist";
pub const CHARACTER_ROLES: &[&str] = &["Protagonist", "Antagonist", "Nebenfigur"];
pub const PITCH_MAX_CHARS: usize = 280;

/// Node kinds participating in the relation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    WorldItem,
}

impl EntityKind {
    /// Relation type preselected when the user adds a new row.
    pub fn default_relation_type(self) -> RelationType {
        match self {
            Self::Character => RelationType::Freund,
            Self::WorldItem => RelationType::TeilVon,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::WorldItem => "world_item",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "character" => Some(Self::Character),
            "world_item" => Some(Self::WorldItem),
            _ => None,
        }
    }
}

/// A character or world-building entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub project_id: ProjectId,
    pub kind: EntityKind,
    pub name: String,
    /// Role for characters, world kind (e.g. "Königreich") for world items.
    pub category: String,
    pub age: Option<u32>,
    pub description: String,
    pub relations: Vec<Relation>,
}

impl Entity {
    pub fn new(project_id: ProjectId, kind: EntityKind, name: impl Into<String>) -> Self {
        let category = match kind {
            EntityKind::Character => String::new(),
            EntityKind::WorldItem => DEFAULT_WORLD_CATEGORY.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            project_id,
            kind,
            name: name.into(),
            category,
            age: None,
            description: String::new(),
            relations: Vec::new(),
        }
    }

    /// Validates entity-local invariants before persistence.
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        if self.name.trim().is_empty() {
            return Err(EntityValidationError::BlankName);
        }
        if self.kind != EntityKind::Character && self.age.is_some() {
            return Err(EntityValidationError::AgeOnWorldItem);
        }
        if self.relations.iter().any(|edge| edge.to_id == self.id) {
            return Err(EntityValidationError::SelfRelation(self.id));
        }
        Ok(())
    }

    /// Checks that a record about to be inserted carries no edges.
    ///
    /// Edges are only written through relation saves, which also write
    /// their mirrors.
    pub fn validate_new(&self) -> Result<(), EntityValidationError> {
        self.validate()?;
        if !self.relations.is_empty() {
            return Err(EntityValidationError::RelationsOnCreate);
        }
        Ok(())
    }

    /// Applies a field patch in place.
    pub fn apply(&mut self, patch: &EntityPatch) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.clone();
        }
        if let Some(category) = patch.category.as_ref() {
            self.category = category.clone();
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(description) = patch.description.as_ref() {
            self.description = description.clone();
        }
    }
}

/// Validation failures for entity records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValidationError {
    BlankName,
    AgeOnWorldItem,
    SelfRelation(EntityId),
    RelationsOnCreate,
    MissingSheetField(&'static str),
    PitchTooLong { chars: usize },
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "entity name must not be blank"),
            Self::AgeOnWorldItem => write!(f, "age is only allowed on characters"),
            Self::SelfRelation(id) => write!(f, "entity {id} must not relate to itself"),
            Self::RelationsOnCreate => {
                write!(f, "new entities start without relations; save them afterwards")
            }
            Self::MissingSheetField(field) => write!(f, "character sheet needs a {field}"),
            Self::PitchTooLong { chars } => write!(
                f,
                "pitch has {chars} characters, at most {PITCH_MAX_CHARS} are allowed"
            ),
        }
    }
}

impl Error for EntityValidationError {}

/// Partial field update for an entity. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    /// `Some(None)` clears the age.
    pub age: Option<Option<u32>>,
    pub description: Option<String>,
}

impl EntityPatch {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn category(value: impl Into<String>) -> Self {
        Self {
            category: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn description(value: impl Into<String>) -> Self {
        Self {
            description: Some(value.into()),
            ..Self::default()
        }
    }

    /// Builds an age patch from raw text input.
    pub fn age_input(raw: &str) -> Self {
        Self {
            age: Some(coerce_age(raw)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.age.is_none()
            && self.description.is_none()
    }
}

/// Answers collected when a character is created step by step.
///
/// Name, pitch, goal and conflict are required. Everything else is folded
/// into the description as labelled lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterSheet {
    pub name: String,
    pub role: String,
    /// Raw age input; digits only are kept.
    pub age: String,
    pub pitch: String,
    pub goal: String,
    pub conflict: String,
    pub factions: String,
    pub strengths: String,
    pub weaknesses: String,
    pub secret: String,
    pub voice: String,
    pub notes: String,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: DEFAULT_CHARACTER_ROLE.to_string(),
            age: String::new(),
            pitch: String::new(),
            goal: String::new(),
            conflict: String::new(),
            factions: String::new(),
            strengths: String::new(),
            weaknesses: String::new(),
            secret: String::new(),
            voice: String::new(),
            notes: String::new(),
        }
    }
}

impl CharacterSheet {
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        let required = [
            ("name", &self.name),
            ("pitch", &self.pitch),
            ("goal", &self.goal),
            ("conflict", &self.conflict),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(EntityValidationError::MissingSheetField(field));
        }
        let chars = self.pitch.chars().count();
        if chars > PITCH_MAX_CHARS {
            return Err(EntityValidationError::PitchTooLong { chars });
        }
        Ok(())
    }

    /// Labelled description lines, skipping empty answers.
    pub fn description(&self) -> String {
        [
            ("Pitch", &self.pitch),
            ("Ziel", &self.goal),
            ("Konflikt", &self.conflict),
            ("Zugehörigkeit", &self.factions),
            ("Stärken", &self.strengths),
            ("Schwächen", &self.weaknesses),
            ("Geheimnis", &self.secret),
            ("Stimme", &self.voice),
            ("Notizen", &self.notes),
        ]
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
    }

    /// Validates the sheet and builds the character it describes.
    pub fn to_entity(&self, project_id: ProjectId) -> Result<Entity, EntityValidationError> {
        self.validate()?;
        let mut entity = Entity::new(project_id, EntityKind::Character, self.name.trim());
        entity.category = self.role.clone();
        entity.age = coerce_age(&self.age);
        entity.description = self.description();
        Ok(entity)
    }
}

/// Keeps digits only; empty input means "no age".
pub fn coerce_age(raw: &str) -> Option<u32> {
    let digits = raw
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::{
        coerce_age, CharacterSheet, Entity, EntityKind, EntityPatch, EntityValidationError,
    };
    use crate::model::relation::{Relation, RelationType};
    use uuid::Uuid;

    #[test]
    fn coerce_age_strips_non_digits() {
        assert_eq!(coerce_age("42 Jahre"), Some(42));
        assert_eq!(coerce_age(""), None);
        assert_eq!(coerce_age("alt"), None);
    }

    #[test]
    fn validate_rejects_self_relation() {
        let mut entity = Entity::new(Uuid::new_v4(), EntityKind::Character, "Anna");
        entity
            .relations
            .push(Relation::new(entity.id, RelationType::Freund));
        assert_eq!(
            entity.validate(),
            Err(EntityValidationError::SelfRelation(entity.id))
        );
    }

    #[test]
    fn apply_patch_only_touches_given_fields() {
        let mut entity = Entity::new(Uuid::new_v4(), EntityKind::Character, "Anna");
        entity.description = "Heldin".to_string();
        entity.apply(&EntityPatch::age_input("17"));
        assert_eq!(entity.age, Some(17));
        assert_eq!(entity.name, "Anna");
        assert_eq!(entity.description, "Heldin");
    }

    #[test]
    fn world_items_default_to_general_category() {
        let item = Entity::new(Uuid::new_v4(), EntityKind::WorldItem, "Nordreich");
        assert_eq!(item.category, "Allgemein");
        assert_eq!(
            EntityKind::WorldItem.default_relation_type(),
            RelationType::TeilVon
        );
    }

    fn sheet() -> CharacterSheet {
        CharacterSheet {
            name: "  Mira ".to_string(),
            age: "19 Jahre".to_string(),
            pitch: "Schmugglerin mit Gewissen.".to_string(),
            goal: "Ihren Bruder befreien.".to_string(),
            conflict: "Die Gilde jagt sie.".to_string(),
            strengths: "mutig, flink".to_string(),
            ..CharacterSheet::default()
        }
    }

    #[test]
    fn character_sheet_requires_core_answers() {
        let mut incomplete = sheet();
        incomplete.goal = "   ".to_string();
        assert_eq!(
            incomplete.validate(),
            Err(EntityValidationError::MissingSheetField("goal"))
        );

        let mut long = sheet();
        long.pitch = "x".repeat(281);
        assert_eq!(
            long.validate(),
            Err(EntityValidationError::PitchTooLong { chars: 281 })
        );
    }

    #[test]
    fn character_sheet_builds_labelled_description() {
        let entity = sheet().to_entity(Uuid::new_v4()).unwrap();
        assert_eq!(entity.name, "Mira");
        assert_eq!(entity.category, "Protagonist");
        assert_eq!(entity.age, Some(19));
        assert_eq!(
            entity.description,
            "Pitch: Schmugglerin mit Gewissen.\nZiel: Ihren Bruder befreien.\nKonflikt: Die Gilde jagt sie.\nStärken: mutig, flink"
        );
        assert!(entity.relations.is_empty());
    }

    #[test]
    fn new_records_must_not_carry_edges() {
        let mut entity = Entity::new(Uuid::new_v4(), EntityKind::Character, "Anna");
        entity
            .relations
            .push(Relation::new(Uuid::new_v4(), RelationType::Freund));
        assert!(entity.validate().is_ok());
        assert_eq!(
            entity.validate_new(),
            Err(EntityValidationError::RelationsOnCreate)
        );
    }
}
