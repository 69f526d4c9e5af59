//! Project/chapter/scene repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the manuscript hierarchy.
//! - Supply scene text to the mention scanner (`SceneSource`).
//!
//! # Invariants
//! - Chapter and scene lists are ordered by `position ASC`, then creation.
//! - Deleting a project or chapter cascades through foreign keys.
//! - `list_scenes_by_project` falls back to chapter enumeration when a
//!   source has no combined listing.

use crate::model::manuscript::{
    Chapter, ChapterId, Project, ProjectId, Scene, SceneId,
};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT uuid, title, description FROM projects";
const CHAPTER_SELECT_SQL: &str = "SELECT uuid, project_uuid, title, position FROM chapters";
const SCENE_SELECT_SQL: &str =
    "SELECT scenes.uuid, scenes.chapter_uuid, scenes.title, scenes.content, scenes.position
     FROM scenes";

/// Read-only scene access used by scanning.
pub trait SceneSource {
    fn list_chapters(&self, project_id: ProjectId) -> RepoResult<Vec<Chapter>>;
    fn list_scenes(&self, chapter_id: ChapterId) -> RepoResult<Vec<Scene>>;

    /// Lists every scene of a project in outline order.
    ///
    /// The default walks chapters first, then each chapter's scenes.
    fn list_scenes_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Scene>> {
        let mut scenes = Vec::new();
        for chapter in self.list_chapters(project_id)? {
            scenes.extend(self.list_scenes(chapter.id)?);
        }
        Ok(scenes)
    }
}

/// Repository interface for manuscript CRUD operations.
pub trait ManuscriptRepository: SceneSource {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Most recently updated first.
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;

    fn create_chapter(&self, chapter: &Chapter) -> RepoResult<ChapterId>;
    fn get_chapter(&self, id: ChapterId) -> RepoResult<Option<Chapter>>;
    fn update_chapter(&self, chapter: &Chapter) -> RepoResult<()>;
    fn delete_chapter(&self, id: ChapterId) -> RepoResult<()>;

    fn create_scene(&self, scene: &Scene) -> RepoResult<SceneId>;
    fn get_scene(&self, id: SceneId) -> RepoResult<Option<Scene>>;
    fn update_scene(&self, scene: &Scene) -> RepoResult<()>;
    fn delete_scene(&self, id: SceneId) -> RepoResult<()>;
}

/// SQLite-backed manuscript repository.
pub struct SqliteManuscriptRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteManuscriptRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn touch_project(&self, project_id: ProjectId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE projects
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [project_id.to_string()],
        )?;
        Ok(())
    }
}

impl SceneSource for SqliteManuscriptRepository<'_> {
    fn list_chapters(&self, project_id: ProjectId) -> RepoResult<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHAPTER_SELECT_SQL}
             WHERE project_uuid = ?1
             ORDER BY position ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut chapters = Vec::new();
        while let Some(row) = rows.next()? {
            chapters.push(parse_chapter_row(row)?);
        }
        Ok(chapters)
    }

    fn list_scenes(&self, chapter_id: ChapterId) -> RepoResult<Vec<Scene>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCENE_SELECT_SQL}
             WHERE scenes.chapter_uuid = ?1
             ORDER BY scenes.position ASC, scenes.created_at ASC, scenes.rowid ASC;"
        ))?;
        let mut rows = stmt.query([chapter_id.to_string()])?;
        let mut scenes = Vec::new();
        while let Some(row) = rows.next()? {
            scenes.push(parse_scene_row(row)?);
        }
        Ok(scenes)
    }

    fn list_scenes_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Scene>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCENE_SELECT_SQL}
             INNER JOIN chapters ON chapters.uuid = scenes.chapter_uuid
             WHERE chapters.project_uuid = ?1
             ORDER BY chapters.position ASC, chapters.created_at ASC, chapters.rowid ASC,
                      scenes.position ASC, scenes.created_at ASC, scenes.rowid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut scenes = Vec::new();
        while let Some(row) = rows.next()? {
            scenes.push(parse_scene_row(row)?);
        }
        Ok(scenes)
    }
}

impl ManuscriptRepository for SqliteManuscriptRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (uuid, title, description) VALUES (?1, ?2, ?3);",
            params![
                project.id.to_string(),
                project.title.as_str(),
                project.description.as_str(),
            ],
        )?;
        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} ORDER BY updated_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                title = ?1,
                description = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3;",
            params![
                project.title.as_str(),
                project.description.as_str(),
                project.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", project.id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }

    fn create_chapter(&self, chapter: &Chapter) -> RepoResult<ChapterId> {
        if self.get_project(chapter.project_id)?.is_none() {
            return Err(RepoError::not_found("project", chapter.project_id));
        }
        self.conn.execute(
            "INSERT INTO chapters (uuid, project_uuid, title, position) VALUES (?1, ?2, ?3, ?4);",
            params![
                chapter.id.to_string(),
                chapter.project_id.to_string(),
                chapter.title.as_str(),
                chapter.position,
            ],
        )?;
        self.touch_project(chapter.project_id)?;
        Ok(chapter.id)
    }

    fn get_chapter(&self, id: ChapterId) -> RepoResult<Option<Chapter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHAPTER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_chapter_row(row)?));
        }
        Ok(None)
    }

    fn update_chapter(&self, chapter: &Chapter) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE chapters
             SET
                title = ?1,
                position = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3;",
            params![
                chapter.title.as_str(),
                chapter.position,
                chapter.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("chapter", chapter.id));
        }
        self.touch_project(chapter.project_id)
    }

    fn delete_chapter(&self, id: ChapterId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM chapters WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("chapter", id));
        }
        Ok(())
    }

    fn create_scene(&self, scene: &Scene) -> RepoResult<SceneId> {
        if self.get_chapter(scene.chapter_id)?.is_none() {
            return Err(RepoError::not_found("chapter", scene.chapter_id));
        }
        self.conn.execute(
            "INSERT INTO scenes (uuid, chapter_uuid, title, content, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                scene.id.to_string(),
                scene.chapter_id.to_string(),
                scene.title.as_str(),
                scene.content.as_str(),
                scene.position,
            ],
        )?;
        Ok(scene.id)
    }

    fn get_scene(&self, id: SceneId) -> RepoResult<Option<Scene>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCENE_SELECT_SQL} WHERE scenes.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_scene_row(row)?));
        }
        Ok(None)
    }

    fn update_scene(&self, scene: &Scene) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE scenes
             SET
                title = ?1,
                content = ?2,
                position = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                scene.title.as_str(),
                scene.content.as_str(),
                scene.position,
                scene.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("scene", scene.id));
        }
        Ok(())
    }

    fn delete_scene(&self, id: SceneId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM scenes WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("scene", id));
        }
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Project {
        id: parse_uuid(&uuid_text, "projects.uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
    })
}

fn parse_chapter_row(row: &Row<'_>) -> RepoResult<Chapter> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    Ok(Chapter {
        id: parse_uuid(&uuid_text, "chapters.uuid")?,
        project_id: parse_uuid(&project_text, "chapters.project_uuid")?,
        title: row.get("title")?,
        position: row.get("position")?,
    })
}

fn parse_scene_row(row: &Row<'_>) -> RepoResult<Scene> {
    let uuid_text: String = row.get(0)?;
    let chapter_text: String = row.get(1)?;
    Ok(Scene {
        id: parse_uuid(&uuid_text, "scenes.uuid")?,
        chapter_id: parse_uuid(&chapter_text, "scenes.chapter_uuid")?,
        title: row.get(2)?,
        content: row.get(3)?,
        position: row.get(4)?,
    })
}
