//! Songkeeper - a local music library that keeps itself in sync.
//!
//! A catalog of songs and albums is kept consistent with a managed folder
//! that may be changed behind the application's back. Files are
//! deduplicated by content, named and optionally grouped by album, and
//! their cover artwork is cached once per distinct image.

pub mod album;
pub mod cli;
pub mod config;
pub mod cover;
pub mod db;
pub mod error;
pub mod hash;
pub mod importer;
pub mod library;
pub mod metadata;
pub mod model;
pub mod organizer;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter(&std::env::var("RUST_LOG").unwrap_or_default())?)
        .init();

    cli::run_command(&args)
}

/// `RUST_LOG` directives over a default of `info`, with sqlx kept quiet.
fn log_filter(directives: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
        .add_directive("sqlx=warn".parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_info() {
        let filter = log_filter("").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_log_filter_honours_rust_log() {
        let filter = log_filter("debug").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
