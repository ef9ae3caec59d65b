//! Screen capture using the `xcap` crate.
//!
//! This is the infrastructure layer — it talks to the OS.

use super::region::{crop_region, ScreenRect};
use super::{CaptureError, CaptureService};
use image::DynamicImage;
use std::time::{Duration, Instant};
use xcap::Monitor;

/// How long to wait for the selection overlay to leave the screen
/// before grabbing pixels.
pub const OVERLAY_SETTLE: Duration = Duration::from_millis(150);

/// Grabs regions of the primary monitor.
pub struct XcapCapture {
    settle: Duration,
}

impl XcapCapture {
    pub fn new() -> Self {
        Self {
            settle: OVERLAY_SETTLE,
        }
    }
}

impl Default for XcapCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureService for XcapCapture {
    fn capture(&self, rect: ScreenRect) -> Result<DynamicImage, CaptureError> {
        std::thread::sleep(self.settle);

        let start = Instant::now();
        let screen = capture_primary_monitor()?;
        let region = crop_region(&screen, rect)?;

        log::info!(
            "[CAPTURE] Grabbed {}x{} at {},{} in {}ms",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            start.elapsed().as_millis()
        );

        Ok(region)
    }
}

/// Captures the primary monitor's screen as a `DynamicImage`.
///
/// The caller is responsible for cropping to the user's selection.
pub fn capture_primary_monitor() -> Result<DynamicImage, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

    let mut fallback = None;
    let mut primary = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            primary = Some(monitor);
            break;
        }
        // If no monitor reports as primary, use the first one
        if fallback.is_none() {
            fallback = Some(monitor);
        }
    }

    let monitor = primary.or(fallback).ok_or(CaptureError::NoPrimaryMonitor)?;

    let image = monitor
        .capture_image()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

    Ok(DynamicImage::ImageRgba8(image))
}
