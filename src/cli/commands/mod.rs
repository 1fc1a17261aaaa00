//! CLI command definitions and dispatch.
//!
//! Each group of subcommands is implemented in its own submodule:
//! - `library`: synchronization, import, deletion, location and settings
//! - `listing`: song and album listings
//! - `watch`: out-of-band change watching

mod library;
mod listing;
mod watch;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db::db_url;
use crate::library::Library;
use crate::model::SongId;

pub use library::{cmd_config, cmd_delete, cmd_import, cmd_locate, cmd_settings, cmd_sync};
pub use listing::{cmd_albums, cmd_list};
pub use watch::cmd_watch;

/// Songkeeper CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Managed library root (overrides the config file)
    #[arg(long, global = true, env = "SONGKEEPER_ROOT")]
    pub root: Option<PathBuf>,

    /// Catalog database file (overrides the config file)
    #[arg(long, global = true, env = "SONGKEEPER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the catalog with the library folder
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy audio files into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List songs, newest import first
    List {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List albums by name
    Albums {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Delete a song and its file
    Delete {
        /// Song id (as shown by `list`)
        id: SongId,
    },
    /// Print the playable file location of a song
    Locate {
        /// Song id (as shown by `list`)
        id: SongId,
    },
    /// Show or change library settings
    Settings {
        /// Put future imports into per-album folders
        #[arg(long, value_name = "BOOL")]
        group_by_album: Option<bool>,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
    /// Synchronize, then keep the catalog in step with the folder until Ctrl+C
    Watch,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = config::load();

    match &cli.command {
        Commands::Sync { json } => cmd_sync(&rt, cli, &config, *json),
        Commands::Import { paths, json } => cmd_import(&rt, cli, &config, paths, *json),
        Commands::List { json } => cmd_list(&rt, cli, &config, *json),
        Commands::Albums { json } => cmd_albums(&rt, cli, &config, *json),
        Commands::Delete { id } => cmd_delete(&rt, cli, &config, *id),
        Commands::Locate { id } => cmd_locate(&rt, cli, &config, *id),
        Commands::Settings { group_by_album } => cmd_settings(&rt, cli, &config, *group_by_album),
        Commands::Config { save } => cmd_config(cli, &config, *save),
        Commands::Watch => cmd_watch(&rt, cli, &config),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Open the library named by the CLI flags or the config file.
///
/// With `sync` set and `sync_on_start` enabled, a synchronization pass runs
/// before the library is handed back.
pub(crate) async fn open_library(cli: &Cli, config: &Config, sync: bool) -> anyhow::Result<Library> {
    let effective = effective_config(cli, config);
    let root = effective.library.root;
    let db_path = effective.library.database;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut library = Library::open(root, &db_url(Some(&db_path))).await?;
    if sync && config.library.sync_on_start {
        library.synchronize().await;
    }
    Ok(library)
}

/// The config file's settings with the command-line overrides applied.
pub(crate) fn effective_config(cli: &Cli, config: &Config) -> Config {
    let mut effective = config.clone();
    if let Some(root) = &cli.root {
        effective.library.root = root.clone();
    }
    if let Some(db) = &cli.db {
        effective.library.database = db.clone();
    }
    effective
}
