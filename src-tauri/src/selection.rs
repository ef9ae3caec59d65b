//! Drag-to-select state machine behind the overlay window.
//!
//! Pure state: the overlay commands feed it pointer positions and act on
//! what it returns (redraw, close, start a capture).

use crate::capture::{ScreenPoint, ScreenRect};

/// What a pointer release means for the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// No drag was in progress; nothing changes.
    Ignored,
    /// The drag ended with zero area. The overlay closes, nothing is emitted.
    Discarded,
    /// The drag produced a usable rectangle. The overlay closes.
    Selected(ScreenRect),
}

/// Tracks one press → move → release gesture.
#[derive(Debug, Default)]
pub struct RegionSelector {
    start: ScreenPoint,
    end: ScreenPoint,
    in_progress: bool,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to "no selection". Called whenever the overlay is shown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Begins a drag at `at`. Returns the (empty) frame to draw.
    pub fn press(&mut self, at: ScreenPoint) -> ScreenRect {
        self.start = at;
        self.end = at;
        self.in_progress = true;
        self.current()
    }

    /// Moves the loose corner. Returns the frame to redraw, or `None`
    /// when no drag is in progress.
    pub fn drag(&mut self, to: ScreenPoint) -> Option<ScreenRect> {
        if !self.in_progress {
            return None;
        }
        self.end = to;
        Some(self.current())
    }

    /// Ends the drag at `at`.
    pub fn release(&mut self, at: ScreenPoint) -> ReleaseOutcome {
        if !self.in_progress {
            return ReleaseOutcome::Ignored;
        }
        self.end = at;
        self.in_progress = false;

        let rect = self.current();
        if rect.is_valid() {
            ReleaseOutcome::Selected(rect)
        } else {
            ReleaseOutcome::Discarded
        }
    }

    fn current(&self) -> ScreenRect {
        ScreenRect::from_corners(self.start, self.end)
    }
}
