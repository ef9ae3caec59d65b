//! Streamer Companion — Tauri application entry point.
//!
//! This is the app shell that wires together:
//! - Configuration (config.rs)
//! - Selection overlay + drag state machine (overlay.rs, selection.rs)
//! - Screen capture domain (capture/)
//! - Remote text extraction / translation / keywords (analysis/)
//! - The single background task and its hand-off to the UI (orchestrator.rs)
//! - Indicator and result windows (presentation.rs)
//! - System tray (tray.rs)

pub mod analysis;
pub mod capture;
pub mod config;
pub mod orchestrator;
mod overlay;
pub mod pipeline;
mod presentation;
pub mod selection;
mod tray;

use analysis::GeminiClient;
use capture::XcapCapture;
use config::AppConfig;
use orchestrator::CaptureOrchestrator;
use overlay::SelectorState;
use presentation::{OrchestratorState, ResultStore, WindowPresenter};
use std::sync::{Arc, Mutex};
use tauri::Manager;

/// Entry point — called by `main.rs`.
///
/// Exits with status 1 before any window is shown when the API key is
/// missing.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::init();

    if let Err(e) = dotenvy::dotenv() {
        log::debug!("[CONFIG] No .env file loaded: {}", e);
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("[CONFIG] {}", e);
            eprintln!("{} Saindo.", e);
            std::process::exit(1);
        }
    };
    log::info!("[CONFIG] Model: {} ({})", config.model, config.api_base);

    let results = ResultStore::default();
    let analysis = Arc::new(GeminiClient::from_config(&config));

    let app = tauri::Builder::default()
        .manage(config)
        .manage(SelectorState::default())
        .manage(results.clone())
        .invoke_handler(tauri::generate_handler![
            overlay::overlay_pointer_down,
            overlay::overlay_pointer_move,
            overlay::overlay_pointer_up,
            presentation::take_result_text
        ])
        .setup(move |app| {
            log::info!("Streamer Companion starting up");

            let handle = app.handle().clone();
            let orchestrator = CaptureOrchestrator::new(
                Arc::new(XcapCapture::new()),
                analysis,
                WindowPresenter::new(handle.clone(), results),
                presentation::main_thread_waker(handle),
            );
            app.manage(OrchestratorState(Mutex::new(orchestrator)));

            tray::setup_tray(app.handle())?;
            log::info!("System tray initialized");

            overlay::open_overlay(app.handle())?;
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("Error building Streamer Companion");

    app.run(|_app, event| {
        // Closing the last window keeps the tray alive; only "Sair" quits.
        if let tauri::RunEvent::ExitRequested {
            code: None, api, ..
        } = event
        {
            api.prevent_exit();
        }
    });
}
