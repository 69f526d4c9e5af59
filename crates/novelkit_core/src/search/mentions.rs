//! Name mention counting over scene text.
//!
//! # Responsibility
//! - Count whole-word, case-insensitive occurrences of a name in scenes.
//! - Aggregate counts per owning chapter.
//!
//! # Invariants
//! - The query is matched literally; regex metacharacters are escaped.
//! - Chapters without hits never appear in `by_chapter`.
//! - Scanning a project never fails: source errors yield the empty result.

use crate::model::manuscript::{ChapterId, ProjectId, Scene};
use crate::repo::manuscript_repo::SceneSource;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Total and per-chapter mention counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionCounts {
    pub total: usize,
    pub by_chapter: BTreeMap<ChapterId, usize>,
}

impl MentionCounts {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn for_chapter(&self, chapter_id: ChapterId) -> usize {
        self.by_chapter.get(&chapter_id).copied().unwrap_or(0)
    }
}

/// Compiled whole-word matcher for one name.
#[derive(Debug, Clone)]
pub struct MentionMatcher {
    pattern: Regex,
    guard_start: bool,
    guard_end: bool,
}

impl MentionMatcher {
    /// Builds a matcher for `name`, or `None` when the trimmed name is empty.
    ///
    /// Edges that are word characters get a regex word boundary. Edges that
    /// are punctuation instead reject hits glued to a word character, so
    /// `A.B.` matches in `A.B. kam` but not in `A.B.Cox`.
    pub fn new(name: &str) -> Option<Self> {
        let needle = name.trim();
        let first = needle.chars().next()?;
        let last = needle.chars().next_back()?;

        let mut source = String::with_capacity(needle.len() + 8);
        if is_word_char(first) {
            source.push_str(r"\b");
        }
        source.push_str(&regex::escape(needle));
        if is_word_char(last) {
            source.push_str(r"\b");
        }

        // An escaped literal always compiles.
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self {
            pattern,
            guard_start: !is_word_char(first),
            guard_end: !is_word_char(last),
        })
    }

    pub fn count(&self, text: &str) -> usize {
        self.pattern
            .find_iter(text)
            .filter(|hit| {
                let glued_before = self.guard_start
                    && text[..hit.start()].chars().next_back().is_some_and(is_word_char);
                let glued_after = self.guard_end
                    && text[hit.end()..].chars().next().is_some_and(is_word_char);
                !glued_before && !glued_after
            })
            .count()
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Counts mentions of `name` across already materialized scenes.
pub fn scan_scenes<'a>(name: &str, scenes: impl IntoIterator<Item = &'a Scene>) -> MentionCounts {
    let Some(matcher) = MentionMatcher::new(name) else {
        return MentionCounts::default();
    };

    let mut counts = MentionCounts::default();
    for scene in scenes {
        let hits = matcher.count(&scene.content);
        if hits > 0 {
            counts.total += hits;
            *counts.by_chapter.entry(scene.chapter_id).or_insert(0) += hits;
        }
    }
    counts
}

/// Counts mentions of `name` across every scene of a project.
///
/// Source failures are logged and reported as zero mentions.
pub fn scan_project<S: SceneSource + ?Sized>(
    source: &S,
    project_id: ProjectId,
    name: &str,
) -> MentionCounts {
    if name.trim().is_empty() {
        return MentionCounts::default();
    }

    let started_at = Instant::now();
    let scenes = match source.list_scenes_by_project(project_id) {
        Ok(scenes) => scenes,
        Err(err) => {
            warn!(
                "event=mention_scan module=search status=error project={} error_code=scene_load_failed error={}",
                project_id, err
            );
            return MentionCounts::default();
        }
    };

    let counts = scan_scenes(name, &scenes);
    debug!(
        "event=mention_scan module=search status=ok project={} scenes={} total={} chapters={} duration_ms={}",
        project_id,
        scenes.len(),
        counts.total,
        counts.by_chapter.len(),
        started_at.elapsed().as_millis()
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::{scan_scenes, MentionMatcher};
    use crate::model::manuscript::Scene;
    use uuid::Uuid;

    fn scene(chapter: Uuid, content: &str) -> Scene {
        Scene::new(chapter, "s", 0).with_content(content)
    }

    #[test]
    fn whole_word_match_skips_longer_names() {
        let chapter = Uuid::new_v4();
        let scenes = vec![
            scene(chapter, "Anna trifft Ben"),
            scene(chapter, "Annabelle ist hier"),
        ];
        let counts = scan_scenes("Anna", &scenes);
        assert_eq!(counts.total, 1);
        assert_eq!(counts.for_chapter(chapter), 1);
    }

    #[test]
    fn matching_ignores_case_and_counts_repeats() {
        let matcher = MentionMatcher::new("  ben ").expect("non-empty name");
        assert_eq!(matcher.count("Ben, BEN und ben. Benjamin nicht."), 3);
    }

    #[test]
    fn blank_name_yields_empty_result() {
        let scenes = vec![scene(Uuid::new_v4(), "irgendwas")];
        let counts = scan_scenes("   ", &scenes);
        assert_eq!(counts.total, 0);
        assert!(counts.by_chapter.is_empty());
    }

    #[test]
    fn metacharacters_are_literal() {
        let chapter = Uuid::new_v4();
        let scenes = vec![
            scene(chapter, "Dort standen A.B. und C."),
            scene(chapter, "AxBy war nicht gemeint"),
        ];
        let counts = scan_scenes("A.B.", &scenes);
        assert_eq!(counts.total, 1);

        let initials = MentionMatcher::new("A.B.").expect("non-empty name");
        assert_eq!(initials.count("A.B.Cox kam"), 0);
        assert_eq!(initials.count("(A.B.) kam"), 1);

        let plus = MentionMatcher::new("C++").expect("non-empty name");
        assert_eq!(plus.count("C++ und C"), 1);
        assert_eq!(plus.count("C++x"), 0);

        let dotted = MentionMatcher::new(".Net").expect("non-empty name");
        assert_eq!(dotted.count("ASP.Net und .Net"), 1);
    }

    #[test]
    fn umlaut_names_respect_boundaries() {
        let matcher = MentionMatcher::new("Jörg").expect("non-empty name");
        assert_eq!(matcher.count("Jörg und Jörgen trafen jörg"), 2);
    }

    #[test]
    fn chapters_without_hits_are_omitted() {
        let hit = Uuid::new_v4();
        let miss = Uuid::new_v4();
        let scenes = vec![
            scene(hit, "Ben"),
            scene(miss, "niemand"),
            scene(hit, "Ben und Ben"),
        ];
        let counts = scan_scenes("Ben", &scenes);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.by_chapter.len(), 1);
        assert_eq!(counts.for_chapter(hit), 3);
    }
}
