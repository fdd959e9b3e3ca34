use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use locsync_proto::catalog::{self, LocationCatalog};
use locsync_proto::config::Config;
use locsync_proto::protocol::{Broadcast, Command};
use locsync_proto::storage::JsonFileStore;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use locsync::app::{App, AppSettings};
use locsync::geolocation;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let data_dir = locsync_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("locsync.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // stdout carries the protocol, so logs go to a file.
    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,locsync=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("locsync log: {}", log_path.display());
    info!("locsync starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_else(|e| {
        warn!("config unreadable ({}), using defaults", e);
        Config::default()
    });

    // ── Catalog ──────────────────────────────────────────────────────────────
    let catalog = if config.catalog.locations_toml.exists() {
        catalog::load_locations_from_toml(&config.catalog.locations_toml).with_context(|| {
            format!(
                "loading locations from {}",
                config.catalog.locations_toml.display()
            )
        })?
    } else {
        debug!(
            "{} not found, using built-in locations",
            config.catalog.locations_toml.display()
        );
        LocationCatalog::builtin()
    };
    info!("{} locations loaded", catalog.len());

    let storage = JsonFileStore::open(&config.storage.state_file);
    let geolocator = geolocation::from_config(&config.detection);

    // ── Channels ─────────────────────────────────────────────────────────────
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(256);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Broadcast>();

    // ── stdout writer ────────────────────────────────────────────────────────
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let writer = tokio::spawn(write_broadcasts(out_rx, done_rx));

    // ── stdin reader ─────────────────────────────────────────────────────────
    // A plain thread: a blocked stdin read must not hold up runtime shutdown.
    let error_tx = out_tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse_line(&line) {
                Ok(cmd) => {
                    if cmd_tx.blocking_send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("bad command line {:?}: {}", line, e);
                    let _ = error_tx.send(Broadcast::Error {
                        message: format!("invalid command: {}", e),
                    });
                }
            }
        }
        debug!("stdin closed");
    });

    // ── Run engine ───────────────────────────────────────────────────────────
    let app = App::new(
        Arc::new(catalog),
        Box::new(storage),
        geolocator,
        AppSettings::from_config(&config),
        out_tx,
    );
    let result = app.run(cmd_rx).await;

    let _ = done_tx.send(());
    let _ = writer.await;
    result
}

/// Newline-delimited JSON on stdout until `done` fires, then flush whatever
/// is still queued.
async fn write_broadcasts(
    mut rx: mpsc::UnboundedReceiver<Broadcast>,
    mut done: oneshot::Receiver<()>,
) {
    let mut stdout = tokio::io::stdout();
    loop {
        let broadcast = tokio::select! {
            biased;
            Some(broadcast) = rx.recv() => broadcast,
            _ = &mut done => break,
        };
        if write_line(&mut stdout, &broadcast).await.is_err() {
            return;
        }
    }
    while let Ok(broadcast) = rx.try_recv() {
        if write_line(&mut stdout, &broadcast).await.is_err() {
            return;
        }
    }
}

async fn write_line(stdout: &mut tokio::io::Stdout, broadcast: &Broadcast) -> std::io::Result<()> {
    let line = match broadcast.to_line() {
        Ok(line) => line,
        Err(e) => {
            warn!("could not encode broadcast: {}", e);
            return Ok(());
        }
    };
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
