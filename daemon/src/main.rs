mod capture;
mod clipboard;
mod clock;
mod config;
mod console;
mod controller;
mod event;
mod import;
mod paths;
mod session;
mod settings;
mod status;
mod store;
mod sweeper;

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::controller::{ControlError, Controller};
use crate::event::DaemonEvent;

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,clipmirror_daemon=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Prints a command outcome: the notification, or the refusal prefixed with `error:`.
fn report(outcome: Result<String, ControlError>) {
    match outcome {
        Ok(message) => println!("{message}"),
        Err(e) => println!("error: {e}"),
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = match paths::app_data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        tracing::error!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path(&app_dir);
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        tracing::error!("Config error (using defaults): {e:#}");
        config::Config::default()
    });

    // ── Controller ────────────────────────────────────────────────────────────
    let mut controller = Controller::new(
        clipboard::open(),
        Arc::new(clock::SystemClock),
        initial_config,
        settings::platform_store(&app_dir),
    );

    let status_path = paths::status_file_path(&app_dir);
    status::write_status(&status_path, controller.status());

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    console::start(event_tx.clone());

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }
    drop(event_tx);

    println!("clipmirror-daemon v{} started", env!("CARGO_PKG_VERSION"));
    match controller.directory() {
        Some(dir) => println!("Save directory: {}", dir.display()),
        None => println!("No save directory selected; use 'dir <path>'"),
    }
    if controller.should_auto_start() {
        report(controller.start());
    } else {
        println!("Status: {}", controller.state().label());
    }
    println!("Type 'help' for a list of commands.");
    status::write_status(&status_path, controller.status());

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            DaemonEvent::DirectorySelected(path) => report(controller.select_directory(path)),
            DaemonEvent::StartMonitoring => report(controller.start()),
            DaemonEvent::StopMonitoring => println!("{}", controller.stop().await),
            DaemonEvent::ToggleMonitoring => report(controller.toggle().await),
            DaemonEvent::SaveNow => report(controller.save_now()),

            DaemonEvent::StatusRequested => {
                let status = controller.status();
                println!("Status: {}", status.state.label());
                println!(
                    "Save directory: {}",
                    status.directory.as_deref().unwrap_or("(none)")
                );
                if let Some(path) = &status.last_saved_path {
                    println!("Last saved: {path}");
                }
                if let Some(path) = &status.last_imported_path {
                    println!("Last imported: {path}");
                }
            }

            DaemonEvent::ConfigReloaded(new_config) => {
                println!("{}", controller.reload_config(new_config));
            }

            DaemonEvent::Shutdown => {
                println!("Shutting down");
                controller.shutdown().await;
                status::write_status(&status_path, controller.status());
                break;
            }
        }
        status::write_status(&status_path, controller.status());
    }
}
