//! System tray icon, menu and click handler.
//!
//! The tray is how a new selection starts once the first result is shown.
//! Left-click opens a new selection overlay. Right-click opens the menu.

use crate::overlay;
use tauri::{
    image::Image as TauriImage,
    menu::{MenuBuilder, MenuItemBuilder},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle,
};

/// Decodes the bundled PNG into the RGBA image the tray expects.
fn tray_icon() -> Result<TauriImage<'static>, String> {
    let icon_img = image::load_from_memory(include_bytes!("../icons/32x32.png"))
        .map_err(|e| format!("Failed to decode tray icon: {}", e))?;
    let rgba = icon_img.to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    Ok(TauriImage::new_owned(rgba.into_raw(), w, h))
}

pub fn setup_tray(app: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    let select_item = MenuItemBuilder::with_id("select", "Selecionar região").build(app)?;
    let quit_item = MenuItemBuilder::with_id("quit", "Sair").build(app)?;
    let menu = MenuBuilder::new(app)
        .item(&select_item)
        .separator()
        .item(&quit_item)
        .build()?;

    let _tray = TrayIconBuilder::new()
        .icon(tray_icon()?)
        .tooltip("Streamer Companion: clique para selecionar")
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray_icon, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                log::info!("[TRAY] Icon clicked, opening overlay");
                start_selection(tray_icon.app_handle());
            }
        })
        .on_menu_event(|app, event| {
            if event.id() == "select" {
                start_selection(app);
            } else if event.id() == "quit" {
                log::info!("[TRAY] Quit requested from tray menu");
                app.exit(0);
            }
        })
        .build(app)?;

    Ok(())
}

fn start_selection(app: &AppHandle) {
    if let Err(e) = overlay::open_overlay(app) {
        log::error!("[TRAY] Failed to open overlay: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_icon_decodes_to_rgba() {
        let icon = tray_icon().unwrap();
        assert_eq!((icon.width(), icon.height()), (32, 32));
        assert_eq!(icon.rgba().len(), 32 * 32 * 4);
    }
}
