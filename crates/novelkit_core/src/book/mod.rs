//! Book assembly for preview and print.
//!
//! # Responsibility
//! - Turn an ordered project outline into a paginated document model.
//! - Render that model into escaped, style-free markup.
//!
//! # Invariants
//! - All manuscript text is escaped (`&`, `<`, `>`) before embedding.
//! - Only the first paragraph of a chapter's first scene carries a drop-cap.
//! - Scene titles are not part of the book; only scene content is.

use crate::model::manuscript::ProjectOutline;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const FALLBACK_BOOK_TITLE: &str = "Buch";
const BOOK_SUBTITLE: &str = "Roman – Vorschau";

static CHAPTER_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^kapitel\b").expect("valid chapter prefix regex"));
static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph break regex"));
static LINE_BREAKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n+").expect("valid line break regex"));

/// One paragraph of running text (unescaped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookParagraph {
    pub text: String,
    pub drop_cap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookChapter {
    pub heading: String,
    pub paragraphs: Vec<BookParagraph>,
}

/// Document model of the whole book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDocument {
    pub title: String,
    pub chapters: Vec<BookChapter>,
}

/// Heading text for chapter number `ordinal` (1-based).
///
/// Titles that already start with the word "Kapitel" are used verbatim.
pub fn chapter_heading(ordinal: usize, title: &str) -> String {
    let title = title.trim();
    if CHAPTER_PREFIX_RE.is_match(title) {
        return title.to_string();
    }
    if title.is_empty() {
        format!("Kapitel {ordinal}")
    } else {
        format!("Kapitel {ordinal} — {title}")
    }
}

/// Splits scene text on blank lines; inner line breaks fold into spaces.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_BREAK_RE
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| LINE_BREAKS_RE.replace_all(part, " ").into_owned())
        .collect()
}

/// Escapes markup-significant characters.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Builds the document model from an ordered outline.
pub fn assemble_book(outline: &ProjectOutline) -> BookDocument {
    let title = match outline.project.title.trim() {
        "" => FALLBACK_BOOK_TITLE.to_string(),
        trimmed => trimmed.to_string(),
    };

    let chapters = outline
        .chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            let paragraphs = chapter
                .scenes
                .iter()
                .enumerate()
                .flat_map(|(scene_index, scene)| {
                    split_paragraphs(&scene.content)
                        .into_iter()
                        .enumerate()
                        .map(move |(paragraph_index, text)| BookParagraph {
                            text,
                            drop_cap: scene_index == 0 && paragraph_index == 0,
                        })
                })
                .collect();
            BookChapter {
                heading: chapter_heading(index + 1, &chapter.chapter.title),
                paragraphs,
            }
        })
        .collect();

    BookDocument { title, chapters }
}

/// Renders the document as markup with `chapter-title`/`dropcap` markers.
pub fn render_html(document: &BookDocument) -> String {
    let mut out = String::new();
    out.push_str("<!doctype html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_markup(&document.title)));
    out.push_str("</head>\n<body>\n<div class=\"book\">\n");
    out.push_str("<section class=\"title-page\">\n");
    out.push_str(&format!(
        "<h1 class=\"book-title\">{}</h1>\n<div class=\"book-subtitle\">{}</div>\n",
        escape_markup(&document.title),
        BOOK_SUBTITLE
    ));
    out.push_str("</section>\n");

    for chapter in &document.chapters {
        out.push_str("<section>\n");
        out.push_str(&format!(
            "<h1 class=\"chapter-title\">{}</h1>\n",
            escape_markup(&chapter.heading)
        ));
        for paragraph in &chapter.paragraphs {
            let class = if paragraph.drop_cap {
                " class=\"dropcap\""
            } else {
                ""
            };
            out.push_str(&format!(
                "<p{class}>{}</p>\n",
                escape_markup(&paragraph.text)
            ));
        }
        out.push_str("</section>\n");
    }

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::{assemble_book, chapter_heading, escape_markup, render_html, split_paragraphs};
    use crate::model::manuscript::{Chapter, ChapterOutline, Project, ProjectOutline, Scene};

    #[test]
    fn heading_prefixes_ordinal_unless_title_starts_with_kapitel() {
        assert_eq!(chapter_heading(3, ""), "Kapitel 3");
        assert_eq!(chapter_heading(1, "Kapitel Eins"), "Kapitel Eins");
        assert_eq!(chapter_heading(4, "kapitel vier"), "kapitel vier");
        assert_eq!(chapter_heading(2, "Der Sturm"), "Kapitel 2 — Der Sturm");
        assert_eq!(chapter_heading(5, "Kapitelende"), "Kapitel 5 — Kapitelende");
        assert_eq!(chapter_heading(6, "   "), "Kapitel 6");
    }

    #[test]
    fn paragraphs_split_on_blank_lines_and_fold_line_breaks() {
        let parts = split_paragraphs("Erste Zeile\nzweite Zeile\n\n  \n\nNeuer Absatz\n");
        assert_eq!(parts, vec!["Erste Zeile zweite Zeile", "Neuer Absatz"]);
        assert!(split_paragraphs("\n\n  \n").is_empty());
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_markup("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn dropcap_only_on_first_paragraph_of_first_scene() {
        let project = Project::new("Roman");
        let chapter = Chapter::new(project.id, "", 0);
        let first = Scene::new(chapter.id, "a", 0).with_content("Eins\n\nZwei");
        let second = Scene::new(chapter.id, "b", 1).with_content("Drei");
        let outline = ProjectOutline {
            chapters: vec![ChapterOutline {
                chapter,
                scenes: vec![first, second],
            }],
            project,
        };

        let book = assemble_book(&outline);
        let flags = book.chapters[0]
            .paragraphs
            .iter()
            .map(|paragraph| paragraph.drop_cap)
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(book.chapters[0].heading, "Kapitel 1");
    }

    #[test]
    fn render_escapes_text_and_marks_dropcap() {
        let project = Project::new("<Titel>");
        let chapter = Chapter::new(project.id, "A & B", 0);
        let scene = Scene::new(chapter.id, "a", 0).with_content("x < y");
        let outline = ProjectOutline {
            chapters: vec![ChapterOutline {
                chapter,
                scenes: vec![scene],
            }],
            project,
        };

        let html = render_html(&assemble_book(&outline));
        assert!(html.contains("&lt;Titel&gt;"));
        assert!(html.contains("<h1 class=\"chapter-title\">Kapitel 1 — A &amp; B</h1>"));
        assert!(html.contains("<p class=\"dropcap\">x &lt; y</p>"));
        assert!(!html.contains("<Titel>"));
    }

    #[test]
    fn blank_project_title_falls_back() {
        let outline = ProjectOutline {
            project: Project::new("  "),
            chapters: Vec::new(),
        };
        assert_eq!(assemble_book(&outline).title, "Buch");
    }
}
