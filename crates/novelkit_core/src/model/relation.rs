//! Relation vocabulary and edge records shared by characters and world items.
//!
//! # Responsibility
//! - Define the closed relation type vocabulary and its inverse pairs.
//! - Define persisted edges (`Relation`) and editable edges (`RelationDraft`).
//! - Coerce free-form strength input into the valid range.
//!
//! # Invariants
//! - `strength` is always within `STRENGTH_MIN..=STRENGTH_MAX`.
//! - Every type has exactly one mirror type; symmetric types mirror to
//!   themselves.
//! - Serialized type names are the German UI labels.

use crate::model::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

pub const STRENGTH_MIN: u8 = 1;
pub const STRENGTH_MAX: u8 = 5;
pub const STRENGTH_DEFAULT: u8 = 3;

/// Closed relation vocabulary for characters and world items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "Freund")]
    Freund,
    #[serde(rename = "Feind")]
    Feind,
    #[serde(rename = "Familie")]
    Familie,
    #[serde(rename = "Liebe")]
    Liebe,
    #[serde(rename = "Kollege")]
    Kollege,
    #[serde(rename = "Kennt")]
    Kennt,
    #[serde(rename = "Mentor")]
    Mentor,
    #[serde(rename = "Schützling", alias = "Schüler")]
    Schuetzling,
    #[serde(rename = "Teil von")]
    TeilVon,
    #[serde(rename = "Hat Teil")]
    HatTeil,
    #[serde(rename = "Ort in")]
    OrtIn,
    #[serde(rename = "Beherbergt")]
    Beherbergt,
    #[serde(rename = "Regiert")]
    Regiert,
    #[serde(rename = "Wird regiert von")]
    WirdRegiertVon,
    #[serde(rename = "Hauptstadt von")]
    HauptstadtVon,
    #[serde(rename = "Hat Hauptstadt")]
    HatHauptstadt,
    #[serde(rename = "Mitglied von")]
    MitgliedVon,
    #[serde(rename = "Hat Mitglied")]
    HatMitglied,
    #[serde(rename = "Übergeordnet")]
    Uebergeordnet,
    #[serde(rename = "Untergeordnet")]
    Untergeordnet,
    #[serde(rename = "Verbündet")]
    Verbuendet,
    #[serde(rename = "Konkurriert")]
    Konkurriert,
    #[serde(rename = "Handelt mit")]
    HandeltMit,
}

impl RelationType {
    pub const ALL: [RelationType; 23] = [
        Self::Freund,
        Self::Feind,
        Self::Familie,
        Self::Liebe,
        Self::Kollege,
        Self::Kennt,
        Self::Mentor,
        Self::Schuetzling,
        Self::TeilVon,
        Self::HatTeil,
        Self::OrtIn,
        Self::Beherbergt,
        Self::Regiert,
        Self::WirdRegiertVon,
        Self::HauptstadtVon,
        Self::HatHauptstadt,
        Self::MitgliedVon,
        Self::HatMitglied,
        Self::Uebergeordnet,
        Self::Untergeordnet,
        Self::Verbuendet,
        Self::Konkurriert,
        Self::HandeltMit,
    ];

    /// Stable label used for storage and UI display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Freund => "Freund",
            Self::Feind => "Feind",
            Self::Familie => "Familie",
            Self::Liebe => "Liebe",
            Self::Kollege => "Kollege",
            Self::Kennt => "Kennt",
            Self::Mentor => "Mentor",
            Self::Schuetzling => "Schützling",
            Self::TeilVon => "Teil von",
            Self::HatTeil => "Hat Teil",
            Self::OrtIn => "Ort in",
            Self::Beherbergt => "Beherbergt",
            Self::Regiert => "Regiert",
            Self::WirdRegiertVon => "Wird regiert von",
            Self::HauptstadtVon => "Hauptstadt von",
            Self::HatHauptstadt => "Hat Hauptstadt",
            Self::MitgliedVon => "Mitglied von",
            Self::HatMitglied => "Hat Mitglied",
            Self::Uebergeordnet => "Übergeordnet",
            Self::Untergeordnet => "Untergeordnet",
            Self::Verbuendet => "Verbündet",
            Self::Konkurriert => "Konkurriert",
            Self::HandeltMit => "Handelt mit",
        }
    }

    /// Parses a stored or user-facing label. Accepts `Schüler` as alias.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed == "Schüler" {
            return Some(Self::Schuetzling);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == trimmed)
    }
}

impl Display for RelationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Inverse lookup for asymmetric relation types.
///
/// Types without an entry are treated as symmetric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTypeTable {
    inverses: HashMap<RelationType, RelationType>,
}

impl RelationTypeTable {
    /// Builds the table from one-directional pairs; each pair is registered
    /// in both directions.
    pub fn from_pairs(pairs: &[(RelationType, RelationType)]) -> Self {
        let mut inverses = HashMap::with_capacity(pairs.len() * 2);
        for &(forward, backward) in pairs {
            inverses.insert(forward, backward);
            inverses.insert(backward, forward);
        }
        Self { inverses }
    }

    /// The vocabulary shipped with the assistant.
    pub fn standard() -> Self {
        Self::from_pairs(&[
            (RelationType::Mentor, RelationType::Schuetzling),
            (RelationType::HatTeil, RelationType::TeilVon),
            (RelationType::Beherbergt, RelationType::OrtIn),
            (RelationType::Regiert, RelationType::WirdRegiertVon),
            (RelationType::HatHauptstadt, RelationType::HauptstadtVon),
            (RelationType::HatMitglied, RelationType::MitgliedVon),
            (RelationType::Uebergeordnet, RelationType::Untergeordnet),
        ])
    }

    /// Returns the type the counterpart edge must carry.
    pub fn mirror_type(&self, kind: RelationType) -> RelationType {
        self.inverses.get(&kind).copied().unwrap_or(kind)
    }

    pub fn is_symmetric(&self, kind: RelationType) -> bool {
        !self.inverses.contains_key(&kind)
    }
}

impl Default for RelationTypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Persisted directed edge owned by its source entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub to_id: EntityId,
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub strength: u8,
    #[serde(default)]
    pub notes: String,
}

impl Relation {
    pub fn new(to_id: EntityId, kind: RelationType) -> Self {
        Self {
            to_id,
            kind,
            strength: STRENGTH_DEFAULT,
            notes: String::new(),
        }
    }

    pub fn with_strength(mut self, strength: u8) -> Self {
        self.strength = clamp_strength_value(i64::from(strength));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Editable copy, used when hydrating the relation editor.
    pub fn to_draft(&self) -> RelationDraft {
        RelationDraft {
            to_id: Some(self.to_id),
            kind: self.kind,
            strength: self.strength,
            notes: self.notes.clone(),
        }
    }
}

/// Relation row as edited in the UI; `to_id` is unset while a target is
/// still being picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDraft {
    pub to_id: Option<EntityId>,
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub strength: u8,
    #[serde(default)]
    pub notes: String,
}

impl RelationDraft {
    pub fn new(to_id: Option<EntityId>, kind: RelationType) -> Self {
        Self {
            to_id,
            kind,
            strength: STRENGTH_DEFAULT,
            notes: String::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.to_id.is_some()
    }

    /// Converts into a persisted edge, clamping strength.
    ///
    /// Returns `None` when no target has been picked yet.
    pub fn complete(&self) -> Option<Relation> {
        self.to_id.map(|to_id| Relation {
            to_id,
            kind: self.kind,
            strength: clamp_strength_value(i64::from(self.strength)),
            notes: self.notes.clone(),
        })
    }
}

/// Partial edit applied to one draft row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDraftPatch {
    pub to_id: Option<Option<EntityId>>,
    pub kind: Option<RelationType>,
    /// Raw strength input as typed by the user.
    pub strength_input: Option<String>,
    pub notes: Option<String>,
}

impl RelationDraft {
    pub fn apply(&mut self, patch: RelationDraftPatch) {
        if let Some(to_id) = patch.to_id {
            self.to_id = to_id;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(input) = patch.strength_input {
            self.strength = clamp_strength(&input);
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

/// Coerces free-form strength input into `1..=5`.
///
/// Non-digit characters are dropped first; empty or zero input falls back to
/// the minimum.
pub fn clamp_strength(input: &str) -> u8 {
    let digits = input
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        return STRENGTH_MIN;
    }
    match digits.parse::<i64>() {
        Ok(value) => clamp_strength_value(value),
        // Overflow: more digits than fit, which is certainly above the max.
        Err(_) => STRENGTH_MAX,
    }
}

fn clamp_strength_value(value: i64) -> u8 {
    if value <= 0 {
        return STRENGTH_MIN;
    }
    value.clamp(i64::from(STRENGTH_MIN), i64::from(STRENGTH_MAX)) as u8
}
