//! Project, chapter and scene records.
//!
//! # Responsibility
//! - Define the manuscript hierarchy `Project > Chapter > Scene`.
//! - Provide derived read-only projections (scene metrics, outline filter).
//!
//! # Invariants
//! - A scene belongs to exactly one chapter, a chapter to exactly one project.
//! - Outline ordering is `(position ASC, created ASC)` on both levels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type ChapterId = Uuid;
pub type SceneId = Uuid;

pub const DEFAULT_PROJECT_TITLE: &str = "Neues Projekt";
pub const DEFAULT_CHAPTER_TITLE: &str = "Neues Kapitel";
pub const DEFAULT_SCENE_TITLE: &str = "Neue Szene";

const WORDS_PER_MINUTE: usize = 200;
const SNIPPET_MAX_CHARS: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
}

impl Project {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub project_id: ProjectId,
    pub title: String,
    pub position: i64,
}

impl Chapter {
    pub fn new(project_id: ProjectId, title: impl Into<String>, position: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,
    pub chapter_id: ChapterId,
    pub title: String,
    pub content: String,
    pub position: i64,
}

impl Scene {
    pub fn new(chapter_id: ChapterId, title: impl Into<String>, position: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            chapter_id,
            title: title.into(),
            content: String::new(),
            position,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn metrics(&self) -> SceneMetrics {
        SceneMetrics::of(&self.content)
    }

    /// Whitespace-collapsed content preview for chapter overviews.
    pub fn snippet(&self) -> String {
        let collapsed = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() > SNIPPET_MAX_CHARS {
            let mut cut = collapsed.chars().take(SNIPPET_MAX_CHARS).collect::<String>();
            cut.push('…');
            cut
        } else {
            collapsed
        }
    }
}

/// Partial update for scene fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub position: Option<i64>,
}

impl Scene {
    pub fn apply(&mut self, patch: &ScenePatch) {
        if let Some(title) = patch.title.as_ref() {
            self.title = title.clone();
        }
        if let Some(content) = patch.content.as_ref() {
            self.content = content.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
    }
}

/// Word/char counts and estimated reading time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMetrics {
    pub words: usize,
    pub chars: usize,
    pub minutes: usize,
}

impl SceneMetrics {
    pub fn of(content: &str) -> Self {
        let words = content.split_whitespace().count();
        let chars = content.chars().count();
        // Round half up, never below one minute.
        let minutes = ((words + WORDS_PER_MINUTE / 2) / WORDS_PER_MINUTE).max(1);
        Self {
            words,
            chars,
            minutes,
        }
    }
}

/// Chapter with its ordered scenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub chapter: Chapter,
    pub scenes: Vec<Scene>,
}

/// Full ordered manuscript tree of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutline {
    pub project: Project,
    pub chapters: Vec<ChapterOutline>,
}

impl ProjectOutline {
    /// Keeps chapters whose title or any scene title contains `query`
    /// (case-insensitive). Blank queries keep everything.
    pub fn filter(&self, query: &str) -> Vec<&ChapterOutline> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.chapters.iter().collect();
        }
        self.chapters
            .iter()
            .filter(|outline| {
                outline.chapter.title.to_lowercase().contains(&needle)
                    || outline
                        .scenes
                        .iter()
                        .any(|scene| scene.title.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.chapters.iter().flat_map(|outline| outline.scenes.iter())
    }
}
