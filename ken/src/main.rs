//! ken - terminal client for the Ken analyst backend.
//!
//! Wires together the terminal lifecycle (`tui`), the unified event bus
//! (`event`), the background API worker (`worker`), the UI (`ui`) and the
//! theme system (`theme`).
//!
//! # Startup sequence
//!
//! 1. Load config and start file logging. Nothing may write to stdout once
//!    the alternate screen is up, so logs go to `$XDG_STATE_HOME/ken/ken.log`.
//! 2. `install_panic_hook()` restores the terminal before the panic message prints.
//! 3. `register_sigterm()` returns a flag polled in the event loop.
//! 4. `init_tui()` enters the alternate screen and raw mode.
//! 5. Spawn the input task and the API worker, then request the workspace list.
//!
//! `restore_tui()` runs after the event loop exits on every path except a
//! panic, which the panic hook covers.

mod app;
mod event;
mod theme;
mod tui;
mod ui;
mod worker;

use std::sync::atomic::Ordering;

use ken_core::config::log_dir;
use ken_core::{ApiClient, Config};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::event::AppEvent;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

/// Starts the file logger. The returned guard flushes buffered lines on drop.
///
/// `RUST_LOG` wins over `default_level` when set.
fn init_logging(default_level: &str) -> std::io::Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    let appender = tracing_appender::rolling::never(&dir, "ken.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (
            Config::default().with_env_overrides(|key| std::env::var(key).ok()),
            Some(e),
        ),
    };
    let _log_guard = init_logging(&config.log_level)?;
    if let Some(e) = config_error {
        warn!(error = %e, "using default config");
    }
    info!(api_url = %config.api_url, theme = %config.theme, "starting");

    let theme = theme::Theme::from_name(&config.theme);
    let api = ApiClient::from_config(&config).map_err(|e| {
        error!(error = %e, "failed to build http client");
        std::io::Error::other(e)
    })?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;

    let (api_tx, api_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(worker::api_worker_loop(
        api,
        config.search_debounce(),
        api_rx,
        handler.tx.clone(),
    ));

    let mut state = app::AppState::new(api_tx);
    state.refresh_workspaces();

    // Exits only via `break` so `restore_tui()` is always reached.
    let outcome = 'event_loop: loop {
        tokio::select! {
            // Polls the SIGTERM flag even when no events arrive.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    info!("SIGTERM received");
                    break 'event_loop Ok(());
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                            break 'event_loop Err(e);
                        }
                    }
                    Some(AppEvent::Key(key)) => {
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop Ok(());
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        if handle_mouse(mouse, &mut state) == KeyAction::Quit {
                            break 'event_loop Ok(());
                        }
                    }
                    Some(AppEvent::Tick) => state.tick = state.tick.wrapping_add(1),
                    Some(AppEvent::Api(api_event)) => state.apply_api_event(*api_event),
                    // ratatui picks up the new size on the next draw.
                    Some(AppEvent::Resize(_, _)) => {}
                    Some(AppEvent::Quit) | None => break 'event_loop Ok(()),
                }
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop Ok(());
                }
            }
        }
    };

    tui::restore_tui()?;
    info!("exiting");
    outcome
}
