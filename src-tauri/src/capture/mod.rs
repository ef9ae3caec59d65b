//! Screen capture domain — public API.
//!
//! This module owns geometry, cropping and the OS screen grab.
//! External code should only use the items exported here.

mod region;
mod screenshot;

pub use region::{crop_region, ScreenPoint, ScreenRect, SelectionFrame};
pub use screenshot::{capture_primary_monitor, XcapCapture, OVERLAY_SETTLE};

use image::DynamicImage;

/// Reads the pixels under a screen rectangle.
///
/// Implementations block; callers run them off the UI thread.
pub trait CaptureService: Send + Sync + 'static {
    fn capture(&self, rect: ScreenRect) -> Result<DynamicImage, CaptureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No primary monitor found")]
    NoPrimaryMonitor,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Capture rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Capture rectangle ({},{},{},{}) exceeds screen bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (i32, i32, u32, u32),
        image_size: (u32, u32),
    },

    #[error("Capture worker stopped: {0}")]
    Interrupted(String),
}
