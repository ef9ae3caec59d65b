//! Build script for the Streamer Companion Tauri app.
//!
//! Generates the Tauri context (config, capabilities, embedded frontend).

fn main() {
    tauri_build::build();
}
