//! Screen geometry and region cropping — functional core.
//!
//! This module has zero infrastructure dependencies.
//! Points and rectangles are in physical pixels relative to the
//! primary monitor's top-left corner.

use super::CaptureError;
use image::DynamicImage;
use serde::Serialize;

/// A pointer position in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts webview (CSS pixel) coordinates into physical pixels.
    pub fn from_logical(x: f64, y: f64, scale_factor: f64) -> Self {
        Self {
            x: (x * scale_factor).round() as i32,
            y: (y * scale_factor).round() as i32,
        }
    }
}

/// An axis-aligned rectangle in physical screen pixels.
///
/// Only rectangles with a non-zero area count as a selection;
/// see [`ScreenRect::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the normalized rectangle spanned by two corners, whichever
    /// direction the drag went.
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.is_valid()
            && other.is_valid()
            && i64::from(self.x) < other.right()
            && i64::from(other.x) < self.right()
            && i64::from(self.y) < other.bottom()
            && i64::from(other.y) < self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &ScreenRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Scales back to webview pixels for drawing on the overlay.
    pub fn to_frame(&self, scale_factor: f64) -> SelectionFrame {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        SelectionFrame {
            x: f64::from(self.x) / scale,
            y: f64::from(self.y) / scale,
            width: f64::from(self.width) / scale,
            height: f64::from(self.height) / scale,
        }
    }
}

/// The rectangle the overlay should draw, in webview pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Crops a full-monitor screenshot to the given rectangle.
///
/// This is a pure function with no side effects.
pub fn crop_region(screen: &DynamicImage, rect: ScreenRect) -> Result<DynamicImage, CaptureError> {
    if !rect.is_valid() {
        return Err(CaptureError::ZeroDimension);
    }

    let (img_width, img_height) = (screen.width(), screen.height());

    let out_of_bounds = || CaptureError::OutOfBounds {
        requested: (rect.x, rect.y, rect.width, rect.height),
        image_size: (img_width, img_height),
    };

    let x = u32::try_from(rect.x).map_err(|_| out_of_bounds())?;
    let y = u32::try_from(rect.y).map_err(|_| out_of_bounds())?;

    let fits_x = x.checked_add(rect.width).is_some_and(|r| r <= img_width);
    let fits_y = y.checked_add(rect.height).is_some_and(|b| b <= img_height);
    if !fits_x || !fits_y {
        return Err(out_of_bounds());
    }

    Ok(screen.crop_imm(x, y, rect.width, rect.height))
}
