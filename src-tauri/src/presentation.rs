//! Indicator and result windows, plus the main-thread side of the
//! orchestrator (wake → pump).

use crate::analysis::GeminiClient;
use crate::capture::{ScreenRect, XcapCapture};
use crate::orchestrator::{indicator_frame, CaptureOrchestrator, Presenter};
use crate::pipeline::AnalysisOutcome;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

pub const INDICATOR_LABEL: &str = "indicator";

/// Indicator size in logical pixels.
const INDICATOR_SIZE: (f64, f64) = (250.0, 100.0);

pub type AppOrchestrator = CaptureOrchestrator<XcapCapture, GeminiClient, WindowPresenter>;

/// Tauri-managed wrapper; only locked on the main thread.
pub struct OrchestratorState(pub Mutex<AppOrchestrator>);

/// Result text waiting for its window to load, keyed by window label.
#[derive(Clone, Default)]
pub struct ResultStore {
    texts: Arc<Mutex<HashMap<String, String>>>,
}

impl ResultStore {
    pub fn insert(&self, label: &str, text: String) {
        match self.texts.lock() {
            Ok(mut texts) => {
                texts.insert(label.to_string(), text);
            }
            Err(e) => log::error!("[RESULT] Store poisoned: {}", e),
        }
    }

    pub fn take(&self, label: &str) -> Option<String> {
        self.texts.lock().ok()?.remove(label)
    }
}

pub struct WindowPresenter {
    app: AppHandle,
    results: ResultStore,
    shown: u64,
}

impl WindowPresenter {
    pub fn new(app: AppHandle, results: ResultStore) -> Self {
        Self {
            app,
            results,
            shown: 0,
        }
    }
}

impl Presenter for WindowPresenter {
    type Indicator = Option<WebviewWindow>;

    fn show_indicator(&mut self, clear_of: ScreenRect) -> Self::Indicator {
        let (width, height) = INDICATOR_SIZE;
        let builder = WebviewWindowBuilder::new(
            &self.app,
            INDICATOR_LABEL,
            WebviewUrl::App("indicator.html".into()),
        )
        .title("Aguarde")
        .inner_size(width, height)
        .resizable(false)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        // Keep it out of the screenshot even if it ends up over the selection
        .content_protected(true);

        let builder = match self.app.primary_monitor() {
            Ok(Some(monitor)) => {
                let scale = monitor.scale_factor();
                let origin = monitor.position();
                let size = monitor.size();
                let screen = ScreenRect::new(0, 0, size.width, size.height);
                let frame = indicator_frame(
                    screen,
                    (width * scale).round() as u32,
                    (height * scale).round() as u32,
                    clear_of,
                );
                builder.position(
                    f64::from(origin.x + frame.x) / scale,
                    f64::from(origin.y + frame.y) / scale,
                )
            }
            Ok(None) => builder.center(),
            Err(e) => {
                log::warn!("[RESULT] No primary monitor for indicator placement: {}", e);
                builder.center()
            }
        };

        let built = builder.build();

        match built {
            Ok(window) => Some(window),
            Err(e) => {
                log::error!("[RESULT] Failed to open indicator: {}", e);
                None
            }
        }
    }

    fn hide_indicator(&mut self, indicator: Self::Indicator) {
        if let Some(window) = indicator {
            if let Err(e) = window.close() {
                log::error!("[RESULT] Failed to close indicator: {}", e);
            }
        }
    }

    fn show_outcome(&mut self, outcome: AnalysisOutcome) {
        self.shown += 1;
        let label = format!("result-{}", self.shown);
        self.results.insert(&label, outcome.display_text());

        let built = WebviewWindowBuilder::new(
            &self.app,
            &label,
            WebviewUrl::App("result.html".into()),
        )
        .title("Resultado da Análise da Imagem")
        .inner_size(600.0, 400.0)
        .position(100.0, 100.0)
        .always_on_top(true)
        .build();

        if let Err(e) = built {
            log::error!("[RESULT] Failed to open result window: {}", e);
            self.results.take(&label);
        }
    }
}

/// Main-thread half of the wake: drain whatever the task queued.
pub fn pump_orchestrator(app: &AppHandle) {
    let state = app.state::<OrchestratorState>();
    let delivered = match state.0.lock() {
        Ok(mut orchestrator) => orchestrator.pump(),
        Err(e) => {
            log::error!("[PIPELINE] Orchestrator lock poisoned: {}", e);
            return;
        }
    };
    if delivered {
        log::info!("[RESULT] Outcome delivered");
    }
}

/// Builds the wake callback handed to the orchestrator: schedules
/// [`pump_orchestrator`] on the main thread.
pub fn main_thread_waker(app: AppHandle) -> impl Fn() + Send + Sync + 'static {
    move || {
        let target = app.clone();
        if let Err(e) = app.run_on_main_thread(move || pump_orchestrator(&target)) {
            log::error!("[PIPELINE] Failed to schedule pump: {}", e);
        }
    }
}

/// Tauri command: the result window fetches its text once on load.
#[tauri::command]
pub fn take_result_text(
    window: WebviewWindow,
    store: tauri::State<'_, ResultStore>,
) -> Result<String, String> {
    store
        .take(window.label())
        .ok_or_else(|| format!("No result stored for window '{}'", window.label()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_store_hands_text_out_once() {
        let store = ResultStore::default();
        store.insert("result-1", "Original: HELLO".to_string());
        let shared = store.clone();
        assert_eq!(shared.take("result-1").as_deref(), Some("Original: HELLO"));
        assert_eq!(store.take("result-1"), None);
        assert_eq!(store.take("result-2"), None);
    }
}
