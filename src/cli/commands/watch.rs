//! Watch the library folder and keep the catalog in step.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::library::print_report;
use super::{Cli, open_library};
use crate::config::Config;
use crate::library::trigger_sync;
use crate::scanner::watcher::{FileWatcher, WatchEvent, next_burst};

/// Quiet period that ends a burst of watch events.
const SETTLE: Duration = Duration::from_millis(250);

/// Synchronize, then re-synchronize on every burst of out-of-band changes
pub fn cmd_watch(rt: &Runtime, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    rt.block_on(watch(cli, config))
}

async fn watch(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let mut library = open_library(cli, config, false).await?;
    if let Some(report) = library.synchronize().await {
        print_report(&report);
    }

    if !config.library.watch_for_changes {
        println!("Watching is disabled (library.watch_for_changes = false).");
        return Ok(());
    }

    let root = library.root().to_path_buf();
    let gate = library.sync_gate();
    let mut status = library.subscribe_status();
    let seen_revision = Arc::new(AtomicU64::new(library.catalog().revision()));
    let library = Arc::new(Mutex::new(library));

    let (watcher, events) = FileWatcher::new(&root)?;
    println!("Watching for changes in: {}", root.display());
    println!("Press Ctrl+C to stop.\n");

    // The watcher delivers on a blocking channel; hand bursts over to the runtime
    let (burst_tx, mut bursts) = mpsc::channel::<usize>(16);
    let forwarder = tokio::task::spawn_blocking(move || {
        while let Some(burst) = next_burst(&events, SETTLE) {
            for event in &burst {
                if let WatchEvent::Error(e) = event {
                    warn!(target: "cli::watch", error = %e, "Watcher reported an error");
                }
            }
            let relevant = burst.iter().filter(|e| e.affects_library()).count();
            if relevant > 0 && burst_tx.blocking_send(relevant).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.is_busy() {
                debug!(target: "cli::watch", status = %current, "Synchronizer status");
            } else {
                info!(target: "cli::watch", status = %current, "Synchronizer status");
            }
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping.");
                break;
            }
            received = bursts.recv() => {
                let Some(changes) = received else { break };
                info!(target: "cli::watch", changes, "Library folder changed");
                let library = Arc::clone(&library);
                let gate = gate.clone();
                let seen_revision = Arc::clone(&seen_revision);
                tokio::spawn(async move {
                    let Some(report) = trigger_sync(&library, &gate).await else {
                        return;
                    };
                    // Quiet passes that neither touched the catalog nor hit errors
                    let revision = library.lock().await.catalog().revision();
                    let changed = seen_revision.swap(revision, Ordering::AcqRel) != revision;
                    if changed || !report.errors.is_empty() || !report.persisted {
                        print_report(&report);
                    } else {
                        debug!(target: "cli::watch", "Pass left the catalog unchanged");
                    }
                });
            }
        }
    }

    drop(watcher);
    if let Err(e) = forwarder.await {
        warn!(target: "cli::watch", error = %e, "Event forwarder ended abnormally");
    }

    // Let a running pass finish before the catalog goes away
    let mut library = library.lock().await;
    library.flush().await;
    Ok(())
}
