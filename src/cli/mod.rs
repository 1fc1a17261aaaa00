//! Command-line interface for songkeeper.
//!
//! This is the presentation layer over the library service: it lists songs
//! and albums, triggers imports and synchronization, and resolves songs to
//! playable file locations.

mod commands;

pub use commands::{Cli, Commands, run_command};
