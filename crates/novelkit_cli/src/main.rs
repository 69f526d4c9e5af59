//! Command-line access to a NovelKit database.
//!
//! # Responsibility
//! - Verify `novelkit_core` linkage (`ping`, `version`).
//! - Run read-side use-cases (outline, mentions, book preview) without the UI.

use clap::{Parser, Subcommand};
use novelkit_core::db::open_db;
use novelkit_core::{
    EntityKind, EntityService, ManuscriptService, SqliteEntityRepository,
    SqliteManuscriptRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

/// NovelKit - manuscript, cast and world tooling for novelists
#[derive(Parser)]
#[command(name = "novelkit", version, about, long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "NOVELKIT_DB_PATH", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,
    /// Print core version
    Version,
    /// List projects, most recently edited first
    Projects,
    /// Print chapters and scenes with reading metrics
    Outline {
        project: Uuid,
        /// Only chapters whose title or scene titles contain this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Count whole-word mentions of a name per chapter
    Mentions { project: Uuid, name: String },
    /// Render the book preview markup
    Book {
        project: Uuid,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// List characters or world items with their relations
    Cast {
        project: Uuid,
        /// Show world items instead of characters
        #[arg(long)]
        world: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Ping => println!("novelkit_core ping={}", novelkit_core::ping()),
        Commands::Version => println!("novelkit_core version={}", novelkit_core::core_version()),
        Commands::Projects => {
            let conn = open(cli.db)?;
            let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
            for project in service.list_projects().map_err(|err| err.to_string())? {
                println!("{}  {}", project.id, project.title);
            }
        }
        Commands::Outline { project, filter } => {
            let conn = open(cli.db)?;
            let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
            let outline = service
                .load_outline(project)
                .map_err(|err| err.to_string())?;
            println!("{}", outline.project.title);
            for chapter in outline.filter(filter.as_deref().unwrap_or("")) {
                println!("  {}", chapter.chapter.title);
                for scene in &chapter.scenes {
                    let metrics = scene.metrics();
                    println!(
                        "    {} ({} Wörter, {} Zeichen, ~{} min)",
                        scene.title, metrics.words, metrics.chars, metrics.minutes
                    );
                }
            }
        }
        Commands::Mentions { project, name } => {
            let conn = open(cli.db)?;
            let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
            let outline = service
                .load_outline(project)
                .map_err(|err| err.to_string())?;
            let counts = service.scan_mentions(project, &name);
            println!("{name}: {} Erwähnung(en)", counts.total);
            for chapter in &outline.chapters {
                let hits = counts.for_chapter(chapter.chapter.id);
                if hits > 0 {
                    println!("  {}: {hits}", chapter.chapter.title);
                }
            }
        }
        Commands::Book { project, out } => {
            let conn = open(cli.db)?;
            let service = ManuscriptService::new(SqliteManuscriptRepository::new(&conn));
            let html = service.book_html(project).map_err(|err| err.to_string())?;
            match out {
                Some(path) => std::fs::write(&path, html)
                    .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?,
                None => print!("{html}"),
            }
        }
        Commands::Cast { project, world } => {
            let mut conn = open(cli.db)?;
            let service = EntityService::new(SqliteEntityRepository::new(&mut conn));
            let kind = if world {
                EntityKind::WorldItem
            } else {
                EntityKind::Character
            };
            let entities = service
                .list_entities(project, kind)
                .map_err(|err| err.to_string())?;
            for entity in &entities {
                println!("{}  {}", entity.id, entity.name);
                for edge in &entity.relations {
                    let target = entities
                        .iter()
                        .find(|candidate| candidate.id == edge.to_id)
                        .map_or("?", |candidate| candidate.name.as_str());
                    println!("    {} -> {} ({}/5)", edge.kind, target, edge.strength);
                }
            }
        }
    }
    Ok(())
}

fn open(db: Option<PathBuf>) -> Result<Connection, String> {
    let path = db.ok_or("no database given; pass --db or set NOVELKIT_DB_PATH")?;
    open_db(&path).map_err(|err| format!("failed to open `{}`: {err}", path.display()))
}
