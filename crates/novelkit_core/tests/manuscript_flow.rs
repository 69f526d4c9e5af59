use novelkit_core::db::open_db_in_memory;
use novelkit_core::model::manuscript::{Chapter, Scene};
use novelkit_core::{
    ManuscriptRepository, ManuscriptService, ManuscriptServiceError, RepoError, RepoResult,
    SceneSource, ScenePatch, SqliteManuscriptRepository,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[test]
fn blank_titles_fall_back_to_defaults_and_positions_append() {
    let conn = open_db_in_memory().unwrap();
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));

    let project = service.create_project("  ").unwrap();
    assert_eq!(project.title, "Neues Projekt");

    let first = service.add_chapter(project.id, "").unwrap();
    let second = service.add_chapter(project.id, "Der Sturm").unwrap();
    assert_eq!(first.title, "Neues Kapitel");
    assert_eq!((first.position, second.position), (0, 1));

    let scene = service.add_scene(first.id, "").unwrap();
    assert_eq!(scene.title, "Neue Szene");
    assert!(scene.content.is_empty());
}

#[test]
fn outline_is_ordered_by_position() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteManuscriptRepository::new(&conn);
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let project = service.create_project("Roman").unwrap();

    let late = Chapter::new(project.id, "Später", 5);
    let early = Chapter::new(project.id, "Früher", 1);
    repo.create_chapter(&late).unwrap();
    repo.create_chapter(&early).unwrap();
    repo.create_scene(&Scene::new(early.id, "zwei", 2)).unwrap();
    repo.create_scene(&Scene::new(early.id, "eins", 1)).unwrap();

    let outline = service.load_outline(project.id).unwrap();
    let chapter_titles = outline
        .chapters
        .iter()
        .map(|outline| outline.chapter.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(chapter_titles, vec!["Früher", "Später"]);
    let scene_titles = outline.chapters[0]
        .scenes
        .iter()
        .map(|scene| scene.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(scene_titles, vec!["eins", "zwei"]);
}

#[test]
fn missing_records_map_to_typed_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.load_outline(missing),
        Err(ManuscriptServiceError::ProjectNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.add_scene(missing, "x"),
        Err(ManuscriptServiceError::ChapterNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.update_scene(missing, &ScenePatch::default()),
        Err(ManuscriptServiceError::SceneNotFound(id)) if id == missing
    ));
}

#[test]
fn deleting_a_project_cascades_to_scenes() {
    let conn = open_db_in_memory().unwrap();
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let project = service.create_project("Roman").unwrap();
    let chapter = service.add_chapter(project.id, "Eins").unwrap();
    let scene = service.add_scene(chapter.id, "A").unwrap();

    service.delete_project(project.id).unwrap();
    assert!(service.repo().get_scene(scene.id).unwrap().is_none());
    assert!(service.list_projects().unwrap().is_empty());
}

#[test]
fn debounced_scene_edits_coalesce_into_one_write() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let project = service.create_project("Roman").unwrap();
    let chapter = service.add_chapter(project.id, "Eins").unwrap();
    let scene = service.add_scene(chapter.id, "A").unwrap();

    let start = Instant::now();
    let content = |text: &str| ScenePatch {
        content: Some(text.to_string()),
        ..ScenePatch::default()
    };
    service.edit_scene(scene.id, content("Anna"), start);
    service.edit_scene(scene.id, content("Anna trifft Ben"), start + Duration::from_millis(300));

    assert!(service.flush_due(start + Duration::from_millis(700)).saved.is_empty());
    assert_eq!(service.get_scene(scene.id).unwrap().content, "");

    let summary = service.flush_due(start + Duration::from_millis(900));
    assert_eq!(summary.saved, vec![scene.id]);
    assert_eq!(service.get_scene(scene.id).unwrap().content, "Anna trifft Ben");
    assert!(!service.has_pending_edits());
}

#[test]
fn flush_all_reports_edits_of_deleted_scenes() {
    let conn = open_db_in_memory().unwrap();
    let mut service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let project = service.create_project("Roman").unwrap();
    let chapter = service.add_chapter(project.id, "Eins").unwrap();
    let kept = service.add_scene(chapter.id, "A").unwrap();
    let gone = Uuid::new_v4();

    let now = Instant::now();
    let title = ScenePatch {
        title: Some("Neu".to_string()),
        ..ScenePatch::default()
    };
    service.edit_scene(kept.id, title.clone(), now);
    service.edit_scene(gone, title, now);

    let summary = service.flush_all();
    assert_eq!(summary.saved, vec![kept.id]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, gone);
    assert_eq!(service.get_scene(kept.id).unwrap().title, "Neu");
}

#[test]
fn mentions_are_counted_per_chapter() {
    let conn = open_db_in_memory().unwrap();
    let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
    let project = service.create_project("Roman").unwrap();
    let first = service.add_chapter(project.id, "Eins").unwrap();
    let second = service.add_chapter(project.id, "Zwei").unwrap();
    let third = service.add_chapter(project.id, "Drei").unwrap();

    let write = |chapter, text: &str| {
        let scene = service.add_scene(chapter, "s").unwrap();
        service
            .update_scene(
                scene.id,
                &ScenePatch {
                    content: Some(text.to_string()),
                    ..ScenePatch::default()
                },
            )
            .unwrap();
    };
    write(first.id, "Anna trifft Ben. ANNA lacht.");
    write(second.id, "Annabelle ist hier");
    write(third.id, "Ben sieht anna.");

    let counts = service.scan_mentions(project.id, "Anna");
    assert_eq!(counts.total, 3);
    assert_eq!(counts.for_chapter(first.id), 2);
    assert_eq!(counts.for_chapter(third.id), 1);
    assert!(!counts.by_chapter.contains_key(&second.id));

    let empty = service.scan_mentions(project.id, "");
    assert_eq!(empty.total, 0);
    assert!(empty.by_chapter.is_empty());
}

/// Source without a combined project listing.
struct TwoLevelSource {
    chapters: Vec<Chapter>,
    scenes: Vec<Scene>,
}

impl SceneSource for TwoLevelSource {
    fn list_chapters(&self, project_id: Uuid) -> RepoResult<Vec<Chapter>> {
        Ok(self
            .chapters
            .iter()
            .filter(|chapter| chapter.project_id == project_id)
            .cloned()
            .collect())
    }

    fn list_scenes(&self, chapter_id: Uuid) -> RepoResult<Vec<Scene>> {
        Ok(self
            .scenes
            .iter()
            .filter(|scene| scene.chapter_id == chapter_id)
            .cloned()
            .collect())
    }
}

struct OfflineSource;

impl SceneSource for OfflineSource {
    fn list_chapters(&self, _project_id: Uuid) -> RepoResult<Vec<Chapter>> {
        Err(RepoError::Unavailable("backend offline".to_string()))
    }

    fn list_scenes(&self, _chapter_id: Uuid) -> RepoResult<Vec<Scene>> {
        Err(RepoError::Unavailable("backend offline".to_string()))
    }
}

#[test]
fn scanning_falls_back_to_chapter_enumeration() {
    let project_id = Uuid::new_v4();
    let chapter = Chapter::new(project_id, "Eins", 0);
    let source = TwoLevelSource {
        scenes: vec![
            Scene::new(chapter.id, "a", 0).with_content("A.B. und A.B. und AxB."),
            Scene::new(Uuid::new_v4(), "fremd", 0).with_content("A.B."),
        ],
        chapters: vec![chapter.clone()],
    };

    let counts = novelkit_core::scan_project(&source, project_id, "A.B.");
    assert_eq!(counts.total, 2);
    assert_eq!(counts.for_chapter(chapter.id), 2);
}

#[test]
fn unavailable_source_yields_zero_mentions() {
    let counts = novelkit_core::scan_project(&OfflineSource, Uuid::new_v4(), "Anna");
    assert!(counts.is_empty());
    assert!(counts.by_chapter.is_empty());
}
