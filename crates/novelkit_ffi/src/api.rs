//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose manuscript, mention, book and relation use-cases to Dart via FRB.
//! - Translate core errors into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Ids cross the boundary as UUID strings; malformed ids fail the call.
//! - Every call opens its own connection to the configured database.

use log::warn;
use novelkit_core::db::open_db;
use novelkit_core::model::entity::{DEFAULT_CHARACTER_NAME, DEFAULT_WORLD_ITEM_NAME};
use novelkit_core::{
    clamp_strength, core_version as core_version_inner, init_logging as init_logging_inner,
    ping as ping_inner, Entity, EntityKind, EntityService, ManuscriptService, RelationDraft,
    RelationType, ScenePatch, SqliteEntityRepository, SqliteManuscriptRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "novelkit.sqlite3";
const DB_PATH_ENV: &str = "NOVELKIT_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
/// Same `level + log_dir` is idempotent; a different pair is rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action envelope for create/update calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created or updated record.
    pub id: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Uuid) -> Self {
        Self {
            ok: true,
            id: Some(id.to_string()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }

    fn from_result(operation: &str, result: Result<Uuid, String>) -> Self {
        match result {
            Ok(id) => Self::success(format!("{operation} ok."), id),
            Err(err) => Self::failure(format!("{operation} failed: {err}")),
        }
    }
}

/// Creates a project; a blank title becomes "Neues Projekt".
#[flutter_rust_bridge::frb(sync)]
pub fn project_create(title: String) -> ActionResponse {
    let result = with_manuscript(|service| {
        service
            .create_project(&title)
            .map(|project| project.id)
            .map_err(|err| err.to_string())
    });
    ActionResponse::from_result("project_create", result)
}

/// Appends a chapter to a project.
#[flutter_rust_bridge::frb(sync)]
pub fn chapter_create(project_id: String, title: String) -> ActionResponse {
    let result = parse_id(&project_id).and_then(|project_id| {
        with_manuscript(|service| {
            service
                .add_chapter(project_id, &title)
                .map(|chapter| chapter.id)
                .map_err(|err| err.to_string())
        })
    });
    ActionResponse::from_result("chapter_create", result)
}

/// Appends a scene with initial `content` to a chapter.
#[flutter_rust_bridge::frb(sync)]
pub fn scene_create(chapter_id: String, title: String, content: String) -> ActionResponse {
    let result = parse_id(&chapter_id).and_then(|chapter_id| {
        with_manuscript(|service| {
            let scene = service
                .add_scene(chapter_id, &title)
                .map_err(|err| err.to_string())?;
            let patch = ScenePatch {
                content: Some(content),
                ..ScenePatch::default()
            };
            service
                .update_scene(scene.id, &patch)
                .map(|scene| scene.id)
                .map_err(|err| err.to_string())
        })
    });
    ActionResponse::from_result("scene_create", result)
}

/// Creates a character (`kind = "character"`) or world item
/// (`kind = "world_item"`). A blank name keeps the default name.
#[flutter_rust_bridge::frb(sync)]
pub fn entity_create(project_id: String, kind: String, name: String) -> ActionResponse {
    let result = parse_id(&project_id).and_then(|project_id| {
        let kind = EntityKind::parse(kind.trim())
            .ok_or_else(|| format!("unknown entity kind `{}`", kind.trim()))?;
        let name = match (name.trim(), kind) {
            ("", EntityKind::Character) => DEFAULT_CHARACTER_NAME,
            ("", EntityKind::WorldItem) => DEFAULT_WORLD_ITEM_NAME,
            (given, _) => given,
        };
        let entity = Entity::new(project_id, kind, name);
        with_entities(|service| {
            service
                .create(entity)
                .map(|entity| entity.id)
                .map_err(|err| err.to_string())
        })
    });
    ActionResponse::from_result("entity_create", result)
}

/// Mention count of one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterMentionCount {
    pub chapter_id: String,
    pub count: u32,
}

/// Mention scan envelope. Failures surface as zero counts plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionScanResponse {
    pub total: u32,
    /// Chapters with at least one hit.
    pub by_chapter: Vec<ChapterMentionCount>,
    pub message: String,
}

/// Counts whole-word, case-insensitive mentions of `name` in a project.
#[flutter_rust_bridge::frb(sync)]
pub fn mention_scan(project_id: String, name: String) -> MentionScanResponse {
    let result = parse_id(&project_id).and_then(|project_id| {
        with_manuscript(|service| Ok(service.scan_mentions(project_id, &name)))
    });
    match result {
        Ok(counts) => MentionScanResponse {
            total: to_u32(counts.total),
            by_chapter: counts
                .by_chapter
                .iter()
                .map(|(chapter_id, count)| ChapterMentionCount {
                    chapter_id: chapter_id.to_string(),
                    count: to_u32(*count),
                })
                .collect(),
            message: format!("{} mention(s).", counts.total),
        },
        Err(err) => MentionScanResponse {
            total: 0,
            by_chapter: Vec::new(),
            message: format!("mention_scan failed: {err}"),
        },
    }
}

/// Book preview envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPreviewResponse {
    pub ok: bool,
    /// Escaped, style-free markup; empty on failure.
    pub html: String,
    pub message: String,
}

/// Assembles the book preview of a project.
#[flutter_rust_bridge::frb(sync)]
pub fn book_preview_html(project_id: String) -> BookPreviewResponse {
    let result = parse_id(&project_id).and_then(|project_id| {
        with_manuscript(|service| service.book_html(project_id).map_err(|err| err.to_string()))
    });
    match result {
        Ok(html) => BookPreviewResponse {
            ok: true,
            html,
            message: "Book assembled.".to_string(),
        },
        Err(err) => BookPreviewResponse {
            ok: false,
            html: String::new(),
            message: format!("book_preview_html failed: {err}"),
        },
    }
}

/// One relation row as edited in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInput {
    /// Target id; `None` while no target has been picked.
    pub to_id: Option<String>,
    /// German label, e.g. `"Mentor"` or `"Teil von"`.
    pub relation_type: String,
    /// Raw strength text; coerced into `1..=5`.
    pub strength: String,
    pub notes: String,
}

/// Relation save envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRelationsResponse {
    pub ok: bool,
    /// Entities whose relation list was written, owner first.
    pub written: Vec<String>,
    pub message: String,
}

/// Replaces the relation list of `owner_id` and updates mirrored edges.
///
/// Rows without a target make the whole call a no-op with `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn save_relations(owner_id: String, relations: Vec<RelationInput>) -> SaveRelationsResponse {
    let result = parse_id(&owner_id).and_then(|owner_id| {
        let drafts = relations
            .iter()
            .map(to_draft)
            .collect::<Result<Vec<_>, String>>()?;
        with_entities(|service| {
            service
                .save_relations(owner_id, &drafts)
                .map(|outcome| outcome.written)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(written) => SaveRelationsResponse {
            ok: true,
            message: format!("Saved relations of {} entities.", written.len()),
            written: written.iter().map(Uuid::to_string).collect(),
        },
        Err(err) => {
            warn!("event=relations_save module=ffi status=error error={err}");
            SaveRelationsResponse {
                ok: false,
                written: Vec::new(),
                message: format!("save_relations failed: {err}"),
            }
        }
    }
}

/// Coerces raw strength input into `1..=5`.
#[flutter_rust_bridge::frb(sync)]
pub fn clamp_relation_strength(input: String) -> u8 {
    clamp_strength(&input)
}

/// Labels of the relation vocabulary in picker order.
#[flutter_rust_bridge::frb(sync)]
pub fn relation_type_labels() -> Vec<String> {
    RelationType::ALL
        .iter()
        .map(|kind| kind.label().to_string())
        .collect()
}

fn to_draft(input: &RelationInput) -> Result<RelationDraft, String> {
    let kind = RelationType::parse(input.relation_type.trim())
        .ok_or_else(|| format!("unknown relation type `{}`", input.relation_type.trim()))?;
    let to_id = match input.to_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id(raw)?),
    };
    let mut draft = RelationDraft::new(to_id, kind);
    draft.strength = clamp_strength(&input.strength);
    draft.notes = input.notes.clone();
    Ok(draft)
}

fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid id `{}`", raw.trim()))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn open_connection() -> Result<Connection, String> {
    open_db(resolve_db_path()).map_err(|err| format!("DB open failed: {err}"))
}

fn with_manuscript<T>(
    f: impl FnOnce(&ManuscriptService<SqliteManuscriptRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_connection()?;
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    f(&service)
}

fn with_entities<T>(
    f: impl FnOnce(&mut EntityService<SqliteEntityRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let mut conn = open_connection()?;
    let mut service = EntityService::new(SqliteEntityRepository::new(&mut conn));
    f(&mut service)
}

#[cfg(test)]
mod tests {
    use super::{
        book_preview_html, chapter_create, clamp_relation_strength, core_version, entity_create,
        init_logging, mention_scan, ping, project_create, relation_type_labels, save_relations,
        scene_create, RelationInput,
    };
    use novelkit_core::db::open_db;

    fn created_id(response: super::ActionResponse) -> String {
        assert!(response.ok, "{}", response.message);
        response.id.unwrap()
    }

    fn relation(to_id: Option<String>, relation_type: &str, strength: &str) -> RelationInput {
        RelationInput {
            to_id,
            relation_type: relation_type.to_string(),
            strength: strength.to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn strength_is_clamped() {
        assert_eq!(clamp_relation_strength("7".to_string()), 5);
        assert_eq!(clamp_relation_strength("0".to_string()), 1);
        assert_eq!(clamp_relation_strength(String::new()), 1);
        assert_eq!(clamp_relation_strength("4".to_string()), 4);
    }

    #[test]
    fn relation_labels_include_german_vocabulary() {
        let labels = relation_type_labels();
        assert!(labels.contains(&"Wird regiert von".to_string()));
        assert!(labels.contains(&"Schützling".to_string()));
    }

    #[test]
    fn mention_scan_and_book_preview_read_created_scenes() {
        let project_id = created_id(project_create("Die Flut".to_string()));
        let chapter_id = created_id(chapter_create(project_id.clone(), "Der Sturm".to_string()));
        created_id(scene_create(
            chapter_id.clone(),
            "a".to_string(),
            "Anna trifft Ben.\n\nAnnabelle nicht.".to_string(),
        ));

        let counts = mention_scan(project_id.clone(), "anna".to_string());
        assert_eq!(counts.total, 1);
        assert_eq!(counts.by_chapter.len(), 1);
        assert_eq!(counts.by_chapter[0].chapter_id, chapter_id);

        let preview = book_preview_html(project_id);
        assert!(preview.ok, "{}", preview.message);
        assert!(preview.html.contains("Kapitel 1 — Der Sturm"));
        assert!(preview.html.contains("<p class=\"dropcap\">Anna trifft Ben.</p>"));
    }

    #[test]
    fn malformed_ids_fail_without_panicking() {
        let counts = mention_scan("nope".to_string(), "Anna".to_string());
        assert_eq!(counts.total, 0);
        assert!(counts.message.contains("invalid id"));
        assert!(!book_preview_html("nope".to_string()).ok);
    }

    #[test]
    fn save_relations_mirrors_and_rejects_incomplete_rows() {
        let project_id = created_id(project_create(String::new()));
        let anna = created_id(entity_create(
            project_id.clone(),
            "character".to_string(),
            "Anna".to_string(),
        ));
        let ben = created_id(entity_create(
            project_id,
            "character".to_string(),
            "Ben".to_string(),
        ));

        let incomplete = save_relations(
            anna.clone(),
            vec![
                relation(Some(ben.clone()), "Mentor", "3"),
                relation(None, "Freund", "3"),
            ],
        );
        assert!(!incomplete.ok);

        let saved = save_relations(anna.clone(), vec![relation(Some(ben.clone()), "Mentor", "9")]);
        assert!(saved.ok, "{}", saved.message);
        assert_eq!(saved.written, vec![anna.clone(), ben.clone()]);

        let conn = open_db(super::resolve_db_path()).unwrap();
        let (kind, strength): (String, i64) = conn
            .query_row(
                "SELECT type, strength FROM relations WHERE owner_uuid = ?1 AND to_uuid = ?2",
                [ben.as_str(), anna.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "Schützling");
        assert_eq!(strength, 5);
    }

    #[test]
    fn entity_create_stores_given_or_default_name() {
        let project_id = created_id(project_create(String::new()));
        let named = created_id(entity_create(
            project_id.clone(),
            "character".to_string(),
            "  Mira ".to_string(),
        ));
        let unnamed = created_id(entity_create(
            project_id,
            "world_item".to_string(),
            "   ".to_string(),
        ));

        let conn = open_db(super::resolve_db_path()).unwrap();
        let name_of = |id: &str| -> String {
            conn.query_row("SELECT name FROM entities WHERE uuid = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap()
        };
        assert_eq!(name_of(&named), "Mira");
        assert_eq!(name_of(&unnamed), "Neues Element");

        assert!(!entity_create(String::new(), "hero".to_string(), "X".to_string()).ok);
    }
}
