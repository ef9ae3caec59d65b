//! Selection overlay window and its pointer commands.
//!
//! The overlay page forwards primary-button pointer events here. Positions
//! arrive in webview pixels and are converted to physical screen pixels
//! before they reach the [`RegionSelector`].
//!
//! The pointer commands are synchronous so Tauri runs them on the main
//! thread in the order the page sent them.

use crate::capture::{ScreenPoint, ScreenRect, SelectionFrame};
use crate::config::AppConfig;
use crate::pipeline::CaptureRequest;
use crate::presentation::OrchestratorState;
use crate::selection::{RegionSelector, ReleaseOutcome};
use std::sync::Mutex;
use tauri::{
    AppHandle, Manager, PhysicalPosition, PhysicalSize, State, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder,
};

pub const OVERLAY_LABEL: &str = "overlay";

/// Tauri-managed drag state for the overlay.
#[derive(Default)]
pub struct SelectorState(pub Mutex<RegionSelector>);

impl SelectorState {
    fn press(&self, at: ScreenPoint) -> Result<ScreenRect, String> {
        Ok(self.0.lock().map_err(|e| e.to_string())?.press(at))
    }

    fn drag(&self, to: ScreenPoint) -> Result<Option<ScreenRect>, String> {
        Ok(self.0.lock().map_err(|e| e.to_string())?.drag(to))
    }

    fn release(&self, at: ScreenPoint) -> Result<ReleaseOutcome, String> {
        Ok(self.0.lock().map_err(|e| e.to_string())?.release(at))
    }
}

/// Logical bounds of a monitor, for placing the overlay over it exactly.
fn monitor_frame(
    position: PhysicalPosition<i32>,
    size: PhysicalSize<u32>,
    scale: f64,
) -> SelectionFrame {
    ScreenRect::new(position.x, position.y, size.width, size.height).to_frame(scale)
}

/// Opens the full-screen selection overlay with a fresh selector.
///
/// Does nothing while a capture is still being analysed.
pub fn open_overlay(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(window) = app.get_webview_window(OVERLAY_LABEL) {
        window.set_focus()?;
        return Ok(());
    }

    let orchestrator = app.state::<OrchestratorState>();
    let busy = orchestrator.0.lock().map_err(|e| e.to_string())?.is_busy();
    if busy {
        log::warn!("[SELECT] Analysis still running, overlay not opened");
        return Ok(());
    }

    let selector = app.state::<SelectorState>();
    selector.0.lock().map_err(|e| e.to_string())?.reset();

    let builder =
        WebviewWindowBuilder::new(app, OVERLAY_LABEL, WebviewUrl::App("overlay.html".into()))
            .title("Streamer Companion")
            .transparent(true)
            .decorations(false)
            .resizable(false)
            .always_on_top(true)
            .skip_taskbar(true);

    // Pointer positions are offsets from the overlay's top-left, so the
    // overlay must cover exactly the monitor that gets captured.
    let builder = match app.primary_monitor()? {
        Some(monitor) => {
            let frame =
                monitor_frame(*monitor.position(), *monitor.size(), monitor.scale_factor());
            builder
                .position(frame.x, frame.y)
                .inner_size(frame.width, frame.height)
        }
        None => {
            log::warn!("[SELECT] No primary monitor reported, using fullscreen overlay");
            builder.fullscreen(true)
        }
    };
    builder.build()?;

    log::info!("[SELECT] Overlay ready, click and drag to select a region");
    Ok(())
}

fn pointer(window: &WebviewWindow, x: f64, y: f64) -> Result<(ScreenPoint, f64), String> {
    let scale = window.scale_factor().map_err(|e| e.to_string())?;
    Ok((ScreenPoint::from_logical(x, y, scale), scale))
}

/// Tauri command: primary button pressed on the overlay.
#[tauri::command]
pub fn overlay_pointer_down(
    window: WebviewWindow,
    selector: State<'_, SelectorState>,
    x: f64,
    y: f64,
) -> Result<SelectionFrame, String> {
    let (at, scale) = pointer(&window, x, y)?;
    Ok(selector.press(at)?.to_frame(scale))
}

/// Tauri command: pointer moved with the primary button held.
///
/// Returns the frame to redraw, or nothing when no drag is active.
#[tauri::command]
pub fn overlay_pointer_move(
    window: WebviewWindow,
    selector: State<'_, SelectorState>,
    x: f64,
    y: f64,
) -> Result<Option<SelectionFrame>, String> {
    let (to, scale) = pointer(&window, x, y)?;
    Ok(selector.drag(to)?.map(|rect| rect.to_frame(scale)))
}

/// Tauri command: primary button released. Closes the overlay and, for a
/// non-empty rectangle, hands it to the orchestrator on the main thread.
#[tauri::command]
pub fn overlay_pointer_up(
    app: AppHandle,
    window: WebviewWindow,
    selector: State<'_, SelectorState>,
    x: f64,
    y: f64,
) -> Result<(), String> {
    let (at, _) = pointer(&window, x, y)?;
    let outcome = selector.release(at)?;

    match outcome {
        ReleaseOutcome::Ignored => Ok(()),
        ReleaseOutcome::Discarded => {
            log::info!("[SELECT] Zero-area selection discarded");
            window.close().map_err(|e| e.to_string())
        }
        ReleaseOutcome::Selected(rect) => {
            window.close().map_err(|e| e.to_string())?;
            // Window creation inside a sync command can deadlock on Windows
            let handle = app.clone();
            app.run_on_main_thread(move || start_capture(&handle, rect))
                .map_err(|e| e.to_string())
        }
    }
}

fn start_capture(app: &AppHandle, rect: ScreenRect) {
    let credential = app.state::<AppConfig>().credential.clone();
    let request = CaptureRequest::new(rect, credential);

    let orchestrator = app.state::<OrchestratorState>();
    let started = match orchestrator.0.lock() {
        Ok(mut orchestrator) => orchestrator.start_capture(request).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    if let Err(e) = started {
        log::error!("[PIPELINE] Could not start capture: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gesture_through_managed_state_selects_once() {
        let state = SelectorState::default();
        let start = state.press(ScreenPoint::new(100, 100)).unwrap();
        assert_eq!(start, ScreenRect::new(100, 100, 0, 0));
        assert_eq!(
            state.drag(ScreenPoint::new(300, 250)).unwrap(),
            Some(ScreenRect::new(100, 100, 200, 150))
        );
        assert_eq!(
            state.release(ScreenPoint::new(300, 250)).unwrap(),
            ReleaseOutcome::Selected(ScreenRect::new(100, 100, 200, 150))
        );

        // Nothing left in progress once the gesture is done
        assert_eq!(state.drag(ScreenPoint::new(400, 400)).unwrap(), None);
        assert!(!state.0.lock().unwrap().in_progress());
    }

    #[test]
    fn release_before_press_leaves_no_drag_behind() {
        let state = SelectorState::default();
        assert_eq!(
            state.release(ScreenPoint::new(10, 10)).unwrap(),
            ReleaseOutcome::Ignored
        );
        assert!(!state.0.lock().unwrap().in_progress());
    }

    #[test]
    fn overlay_covers_the_primary_monitor_in_logical_pixels() {
        let frame = monitor_frame(
            PhysicalPosition::new(0, 0),
            PhysicalSize::new(3840, 2160),
            2.0,
        );
        assert_eq!(
            frame,
            SelectionFrame {
                x: 0.0,
                y: 0.0,
                width: 1920.0,
                height: 1080.0
            }
        );

        let frame = monitor_frame(
            PhysicalPosition::new(1920, 0),
            PhysicalSize::new(1280, 1024),
            1.0,
        );
        assert_eq!((frame.x, frame.y), (1920.0, 0.0));
        assert_eq!((frame.width, frame.height), (1280.0, 1024.0));
    }
}
