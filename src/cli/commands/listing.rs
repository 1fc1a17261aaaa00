//! Song and album listings.

use tokio::runtime::Runtime;

use super::{Cli, open_library};
use crate::config::Config;
use crate::model::Song;

/// List songs, newest import first
pub fn cmd_list(rt: &Runtime, cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    rt.block_on(list(cli, config, json))
}

async fn list(cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    let library = open_library(cli, config, true).await?;
    let songs = library.songs();

    if json {
        println!("{}", serde_json::to_string_pretty(&songs)?);
        return Ok(());
    }

    println!("{} songs:", songs.len());
    for song in songs {
        println!("{}", song_line(song));
    }
    Ok(())
}

/// List albums by name with their song counts
pub fn cmd_albums(rt: &Runtime, cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    rt.block_on(albums(cli, config, json))
}

async fn albums(cli: &Cli, config: &Config, json: bool) -> anyhow::Result<()> {
    let library = open_library(cli, config, true).await?;
    let albums = library.albums();

    if json {
        println!("{}", serde_json::to_string_pretty(&albums)?);
        return Ok(());
    }

    println!("{} albums:", albums.len());
    for album in albums {
        let artist = album.artist.as_deref().unwrap_or("-");
        let year = album.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        println!(
            "{}  {} - {}{}  [{} songs]",
            album.id,
            artist,
            album.name,
            year,
            album.song_count()
        );
    }
    Ok(())
}

fn song_line(song: &Song) -> String {
    let mut line = format!("{}  {} - {}", song.id, song.artist, song.title);
    if let Some(album) = &song.album {
        line.push_str(&format!("  [{}]", album));
    }
    let total = song.duration.round() as u64;
    line.push_str(&format!("  {}:{:02}", total / 60, total % 60));
    line
}
