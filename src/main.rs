use std::fs::File;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use simplelog::{Config, WriteLogger};

use pagemark::library::{resolve_data_root, resolve_log_path};
use pagemark::notification::NotificationLevel;
use pagemark::settings::{Settings, load_settings, preferred_config_path};
use pagemark::{Command as SessionCommand, DocumentSession, SessionConfig, SidecarStore};

#[derive(Parser, Debug)]
#[command(
    name = "pagemark",
    version,
    about = "Inspect and edit document highlights and bookmarks"
)]
struct Cli {
    /// Root of the highlights/ and bookmarks/ directories
    #[arg(long, global = true, env = "PAGEMARK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides log_level from the settings file
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List highlights of a document
    Highlights {
        document: PathBuf,
        /// Only this page
        #[arg(long)]
        page: Option<u32>,
    },
    /// List bookmarked pages of a document
    Bookmarks { document: PathBuf },
    /// Toggle the bookmark on a page
    Bookmark { document: PathBuf, page: u32 },
    /// Replace the note of a highlight
    Note {
        document: PathBuf,
        id: String,
        text: String,
    },
    /// Delete a highlight
    Remove { document: PathBuf, id: String },
    /// Show where settings, annotations and logs live
    Paths,
}

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref());
    init_logging(cli.log_level.unwrap_or_else(|| settings.log_level_filter()));

    info!("Starting pagemark {:?}", cli.command);
    let res = run(&cli, &settings);
    if let Err(err) = &res {
        error!("Command failed: {err:?}");
    }
    res
}

fn init_logging(level: LevelFilter) {
    // Logging is best effort; the CLI still works without a log file.
    let Ok(log_path) = resolve_log_path() else {
        return;
    };
    if let Ok(file) = File::create(&log_path) {
        let _ = WriteLogger::init(level, Config::default(), file);
    }
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    let paths = resolve_data_root(cli.data_dir.as_deref(), settings)?;
    let config = SessionConfig::from(settings);
    let gateway = Rc::new(SidecarStore::new(&paths.root));

    match &cli.command {
        Command::Highlights { document, page } => {
            let session = DocumentSession::open(document, gateway, &config)?;
            report(&session);
            let mut highlights: Vec<_> = session
                .highlights()
                .all()
                .iter()
                .filter(|h| page.is_none_or(|p| h.page == p))
                .collect();
            highlights.sort_by_key(|h| (h.page, h.created));

            for h in highlights {
                println!(
                    "p{:<4} {}  {:<6}  {:.1},{:.1} {:.1}x{:.1}  {}",
                    h.page,
                    h.id,
                    h.color.name(),
                    h.rect.x,
                    h.rect.y,
                    h.rect.width,
                    h.rect.height,
                    h.note
                );
            }
        }

        Command::Bookmarks { document } => {
            let session = DocumentSession::open(document, gateway, &config)?;
            report(&session);
            for bookmark in session.bookmarks().iter() {
                println!(
                    "p{:<4} {}",
                    bookmark.page,
                    bookmark.created.format("%Y-%m-%d %H:%M")
                );
            }
        }

        Command::Bookmark { document, page } => {
            let mut session = DocumentSession::open(document, gateway, &config)?;
            if session
                .apply(SessionCommand::ToggleBookmarkAt(*page))
                .is_empty()
            {
                bail!("Page {page} cannot be bookmarked");
            }
            report(&session);
            ensure_saved(&session)?;
            if session.bookmarks().is_bookmarked(*page) {
                println!("Bookmarked page {page}");
            } else {
                println!("Removed bookmark from page {page}");
            }
        }

        Command::Note { document, id, text } => {
            let mut session = DocumentSession::open(document, gateway, &config)?;
            if session
                .apply(SessionCommand::EditNote(id.clone()))
                .is_empty()
            {
                bail!("No highlight {id} in {}", session.document().name);
            }
            session.apply(SessionCommand::SaveNote(text.clone()));
            report(&session);
            ensure_saved(&session)?;
        }

        Command::Remove { document, id } => {
            let mut session = DocumentSession::open(document, gateway, &config)?;
            if session
                .apply(SessionCommand::DeleteHighlight(id.clone()))
                .is_empty()
            {
                bail!("No highlight {id} in {}", session.document().name);
            }
            report(&session);
            ensure_saved(&session)?;
        }

        Command::Paths => {
            let config_path = cli.config.clone().or_else(preferred_config_path);
            match config_path {
                Some(path) => println!("config      {}", path.display()),
                None => println!("config      (none)"),
            }
            println!("highlights  {}", paths.highlights_dir.display());
            println!("bookmarks   {}", paths.bookmarks_dir.display());
            let log_path = resolve_log_path().context("Failed to resolve log path")?;
            println!("log         {}", log_path.display());
        }
    }

    Ok(())
}

/// Print pending status messages to stderr, oldest first
fn report(session: &DocumentSession) {
    for n in session.notifications().all().iter().rev() {
        let label = match n.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        eprintln!("{label}: {}", n.message);
    }
}

fn ensure_saved(session: &DocumentSession) -> Result<()> {
    if session.notifications().has_errors() {
        bail!("Changes to {} were not saved", session.document().name);
    }
    Ok(())
}
