//! Library maintenance commands.

use std::path::PathBuf;
use tokio::runtime::Runtime;

use super::{Cli, effective_config, open_library};
use crate::config::{self, Config};
use crate::library::SyncReport;
use crate::model::SongId;

/// Run one synchronization pass and print what changed
pub fn cmd_sync(rt: &Runtime, cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    rt.block_on(sync(cli, config, json))
}

async fn sync(cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    let mut library = open_library(cli, config, false).await?;
    let Some(report) = library.synchronize().await else {
        println!("A synchronization is already running.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Copy files into the library
pub fn cmd_import(
    rt: &Runtime,
    cli: &Cli,
    config: &Config,
    paths: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    rt.block_on(import(cli, config, paths, json))
}

async fn import(cli: &Cli, config: &Config, paths: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let mut library = open_library(cli, config, true).await?;
    let summary = library.import(paths).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Imported {}, skipped {} duplicate(s), {} failed",
            summary.imported, summary.duplicates, summary.failed
        );
        for error in &summary.errors {
            eprintln!("  {}", error);
        }
    }

    match summary.error_message() {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

/// Delete a song together with its file
pub fn cmd_delete(rt: &Runtime, cli: &Cli, config: &Config, id: SongId) -> anyhow::Result<()> {
    rt.block_on(delete(cli, config, id))
}

async fn delete(cli: &Cli, config: &Config, id: SongId) -> anyhow::Result<()> {
    let mut library = open_library(cli, config, false).await?;
    let song = library.delete_song(id).await?;
    println!("Deleted {} - {}", song.artist, song.title);
    Ok(())
}

/// Print where a song's file is right now
pub fn cmd_locate(rt: &Runtime, cli: &Cli, config: &Config, id: SongId) -> anyhow::Result<()> {
    rt.block_on(locate(cli, config, id))
}

async fn locate(cli: &Cli, config: &Config, id: SongId) -> anyhow::Result<()> {
    let library = open_library(cli, config, false).await?;
    let path = library
        .locate(id)
        .ok_or_else(|| anyhow::anyhow!("No song with id {}", id))?;
    println!("{}", path.display());
    Ok(())
}

/// Show or change the persisted settings
pub fn cmd_settings(
    rt: &Runtime,
    cli: &Cli,
    config: &Config,
    group_by_album: Option<bool>,
) -> anyhow::Result<()> {
    rt.block_on(settings(cli, config, group_by_album))
}

async fn settings(cli: &Cli, config: &Config, group_by_album: Option<bool>) -> anyhow::Result<()> {
    let mut library = open_library(cli, config, false).await?;
    let settings = match group_by_album {
        Some(flag) => library.set_group_by_album(flag).await,
        None => {
            let settings = library.settings();
            library.flush().await;
            settings
        }
    };
    println!("group_by_album = {}", settings.group_by_album);
    println!("root           = {}", library.root().display());
    Ok(())
}

/// Print the effective configuration, optionally writing it back
pub fn cmd_config(cli: &Cli, config: &Config, save: bool) -> anyhow::Result<()> {
    let effective = effective_config(cli, config);
    print!("{}", toml::to_string_pretty(&effective)?);

    if save {
        let path = config::save(&effective)?;
        println!("\nSaved to {}", path.display());
    }
    Ok(())
}

pub(crate) fn print_report(report: &SyncReport) {
    println!("Synchronization complete:");
    println!("  adopted:    {}", report.adopted);
    println!("  removed:    {}", report.removed);
    println!("  duplicates: {}", report.duplicates);
    println!("  failed:     {}", report.failed);
    if report.relocated > 0 {
        println!("  relocated:  {}", report.relocated);
    }
    if report.artwork_repaired > 0 {
        println!("  artwork:    {}", report.artwork_repaired);
    }
    if report.albums.created > 0 || report.albums.removed > 0 {
        println!(
            "  albums:     +{} / -{}",
            report.albums.created, report.albums.removed
        );
    }
    if !report.persisted {
        eprintln!("Warning: some changes could not be saved and will be retried next time");
    }
    for error in &report.errors {
        eprintln!("  {}", error);
    }
}
