//! Manuscript use-case service.
//!
//! # Responsibility
//! - Provide project/chapter/scene entry points for the editor and preview.
//! - Queue debounced scene edits and flush them through the repository.
//! - Compose outline loading, mention scanning and book assembly.
//!
//! # Invariants
//! - New chapters and scenes are appended after existing siblings.
//! - Blank titles on create fall back to the German defaults.
//! - Mention scans never fail; other reads surface repository errors.

use crate::autosave::{flush_with, FlushSummary, PendingWrites};
use crate::book::{assemble_book, render_html, BookDocument};
use crate::config::CoreConfig;
use crate::model::manuscript::{
    Chapter, ChapterId, ChapterOutline, Project, ProjectId, ProjectOutline, Scene, SceneId,
    ScenePatch, DEFAULT_CHAPTER_TITLE, DEFAULT_PROJECT_TITLE, DEFAULT_SCENE_TITLE,
};
use crate::repo::manuscript_repo::ManuscriptRepository;
use crate::repo::RepoError;
use crate::search::mentions::{scan_project, MentionCounts};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for manuscript use-cases.
#[derive(Debug)]
pub enum ManuscriptServiceError {
    ProjectNotFound(ProjectId),
    ChapterNotFound(ChapterId),
    SceneNotFound(SceneId),
    Repo(RepoError),
}

impl Display for ManuscriptServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::ChapterNotFound(id) => write!(f, "chapter not found: {id}"),
            Self::SceneNotFound(id) => write!(f, "scene not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ManuscriptServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ManuscriptServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                record: "project",
                id,
            } => Self::ProjectNotFound(id),
            RepoError::NotFound {
                record: "chapter",
                id,
            } => Self::ChapterNotFound(id),
            RepoError::NotFound { record: "scene", id } => Self::SceneNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type ManuscriptResult<T> = Result<T, ManuscriptServiceError>;

/// Use-case service over a manuscript repository.
pub struct ManuscriptService<R: ManuscriptRepository> {
    repo: R,
    scene_edits: PendingWrites<SceneId, ScenePatch>,
}

impl<R: ManuscriptRepository> ManuscriptService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, &CoreConfig::default())
    }

    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self {
            repo,
            scene_edits: PendingWrites::new(config.field_debounce()),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn create_project(&self, title: &str) -> ManuscriptResult<Project> {
        let project = Project::new(title_or(title, DEFAULT_PROJECT_TITLE));
        self.repo.create_project(&project)?;
        info!(
            "event=project_create module=service status=ok project={}",
            project.id
        );
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> ManuscriptResult<Project> {
        self.repo
            .get_project(id)?
            .ok_or(ManuscriptServiceError::ProjectNotFound(id))
    }

    pub fn list_projects(&self) -> ManuscriptResult<Vec<Project>> {
        Ok(self.repo.list_projects()?)
    }

    pub fn update_project(
        &self,
        id: ProjectId,
        title: Option<&str>,
        description: Option<&str>,
    ) -> ManuscriptResult<Project> {
        let mut project = self.get_project(id)?;
        if let Some(title) = title {
            project.title = title.to_string();
        }
        if let Some(description) = description {
            project.description = description.to_string();
        }
        self.repo.update_project(&project)?;
        Ok(project)
    }

    pub fn delete_project(&self, id: ProjectId) -> ManuscriptResult<()> {
        self.repo.delete_project(id)?;
        info!("event=project_delete module=service status=ok project={id}");
        Ok(())
    }

    /// Appends a chapter at the end of the project's outline.
    pub fn add_chapter(&self, project_id: ProjectId, title: &str) -> ManuscriptResult<Chapter> {
        let position = next_position(
            self.repo
                .list_chapters(project_id)?
                .iter()
                .map(|chapter| chapter.position),
        );
        let chapter = Chapter::new(project_id, title_or(title, DEFAULT_CHAPTER_TITLE), position);
        self.repo.create_chapter(&chapter)?;
        Ok(chapter)
    }

    pub fn rename_chapter(&self, id: ChapterId, title: &str) -> ManuscriptResult<Chapter> {
        let mut chapter = self
            .repo
            .get_chapter(id)?
            .ok_or(ManuscriptServiceError::ChapterNotFound(id))?;
        chapter.title = title.to_string();
        self.repo.update_chapter(&chapter)?;
        Ok(chapter)
    }

    pub fn delete_chapter(&mut self, id: ChapterId) -> ManuscriptResult<()> {
        for scene in self.repo.list_scenes(id)? {
            self.scene_edits.cancel(scene.id);
        }
        self.repo.delete_chapter(id)?;
        Ok(())
    }

    /// Appends an empty scene at the end of the chapter.
    pub fn add_scene(&self, chapter_id: ChapterId, title: &str) -> ManuscriptResult<Scene> {
        let position = next_position(
            self.repo
                .list_scenes(chapter_id)?
                .iter()
                .map(|scene| scene.position),
        );
        let scene = Scene::new(chapter_id, title_or(title, DEFAULT_SCENE_TITLE), position);
        self.repo.create_scene(&scene)?;
        Ok(scene)
    }

    pub fn get_scene(&self, id: SceneId) -> ManuscriptResult<Scene> {
        self.repo
            .get_scene(id)?
            .ok_or(ManuscriptServiceError::SceneNotFound(id))
    }

    /// Applies `patch` immediately and returns the stored scene.
    pub fn update_scene(&self, id: SceneId, patch: &ScenePatch) -> ManuscriptResult<Scene> {
        persist_scene_patch(&self.repo, id, patch)
    }

    pub fn delete_scene(&mut self, id: SceneId) -> ManuscriptResult<()> {
        self.scene_edits.cancel(id);
        self.repo.delete_scene(id)?;
        Ok(())
    }

    /// Queues a scene edit; it is written once the field window elapses.
    pub fn edit_scene(&mut self, id: SceneId, patch: ScenePatch, now: Instant) {
        self.scene_edits.record(id, patch, now);
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.scene_edits.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scene_edits.next_deadline()
    }

    /// Writes every scene edit whose quiet period elapsed by `now`.
    pub fn flush_due(&mut self, now: Instant) -> FlushSummary<SceneId> {
        let entries = self.scene_edits.take_due(now);
        let repo = &self.repo;
        flush_with(entries, |id, patch| persist_scene_patch(repo, id, &patch))
    }

    /// Writes every queued scene edit, e.g. before leaving the editor.
    pub fn flush_all(&mut self) -> FlushSummary<SceneId> {
        let entries = self.scene_edits.take_all();
        let repo = &self.repo;
        flush_with(entries, |id, patch| persist_scene_patch(repo, id, &patch))
    }

    /// Loads the ordered chapter/scene tree of a project.
    pub fn load_outline(&self, project_id: ProjectId) -> ManuscriptResult<ProjectOutline> {
        let project = self.get_project(project_id)?;
        let chapters = self
            .repo
            .list_chapters(project_id)?
            .into_iter()
            .map(|chapter| {
                let scenes = self.repo.list_scenes(chapter.id)?;
                Ok(ChapterOutline { chapter, scenes })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;
        Ok(ProjectOutline { project, chapters })
    }

    pub fn scan_mentions(&self, project_id: ProjectId, name: &str) -> MentionCounts {
        scan_project(&self.repo, project_id, name)
    }

    pub fn assemble_book(&self, project_id: ProjectId) -> ManuscriptResult<BookDocument> {
        let outline = self.load_outline(project_id)?;
        let book = assemble_book(&outline);
        info!(
            "event=book_assemble module=service status=ok project={} chapters={}",
            project_id,
            book.chapters.len()
        );
        Ok(book)
    }

    pub fn book_html(&self, project_id: ProjectId) -> ManuscriptResult<String> {
        Ok(render_html(&self.assemble_book(project_id)?))
    }
}

fn persist_scene_patch<R: ManuscriptRepository>(
    repo: &R,
    id: SceneId,
    patch: &ScenePatch,
) -> ManuscriptResult<Scene> {
    let mut scene = repo
        .get_scene(id)?
        .ok_or(ManuscriptServiceError::SceneNotFound(id))?;
    scene.apply(patch);
    repo.update_scene(&scene)?;
    Ok(scene)
}

fn title_or<'a>(title: &'a str, fallback: &'a str) -> &'a str {
    match title.trim() {
        "" => fallback,
        trimmed => trimmed,
    }
}

fn next_position(positions: impl Iterator<Item = i64>) -> i64 {
    positions.max().map_or(0, |max| max + 1)
}
