//! Owns the single in-flight capture task and the "working" indicator.
//!
//! Lifecycle of one attempt:
//! 1. `start_capture` shows the indicator, then spawns the task.
//! 2. The task sends [`PipelineEvent`]s over a channel and calls `wake`
//!    after each one.
//! 3. The UI thread answers the wake by calling `pump`, which drains the
//!    channel. On the terminal event it hides the indicator, shows the
//!    outcome and drops the task handle.
//!
//! `start_capture` and `pump` must only be called from the UI thread.

use crate::analysis::AnalysisClient;
use crate::capture::{CaptureService, ScreenRect};
use crate::pipeline::{
    run_pipeline, AnalysisOutcome, CaptureRequest, CaptureStage, PipelineError, PipelineEvent,
};
use std::sync::Arc;
use tauri::async_runtime::JoinHandle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// The UI side of an attempt.
pub trait Presenter: Send + 'static {
    /// Handle to a visible "working" indicator.
    type Indicator: Send;

    /// Shows the indicator. It must stay out of `clear_of`, the rectangle
    /// about to be captured.
    fn show_indicator(&mut self, clear_of: ScreenRect) -> Self::Indicator;
    fn hide_indicator(&mut self, indicator: Self::Indicator);
    fn show_outcome(&mut self, outcome: AnalysisOutcome);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("A capture is already being analysed")]
    Busy,
}

type WakeFn = Arc<dyn Fn() + Send + Sync>;

struct InFlight<I> {
    // Held only to own the task until its outcome is shown.
    _task: JoinHandle<()>,
    events: UnboundedReceiver<PipelineEvent>,
    indicator: Option<I>,
}

pub struct CaptureOrchestrator<C, A, P: Presenter> {
    capture: Arc<C>,
    analysis: Arc<A>,
    presenter: P,
    wake: WakeFn,
    in_flight: Option<InFlight<P::Indicator>>,
    stage: CaptureStage,
}

impl<C, A, P> CaptureOrchestrator<C, A, P>
where
    C: CaptureService,
    A: AnalysisClient,
    P: Presenter,
{
    /// `wake` is called from the background task whenever an event is
    /// queued; it should schedule `pump` on the UI thread.
    pub fn new(
        capture: Arc<C>,
        analysis: Arc<A>,
        presenter: P,
        wake: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            capture,
            analysis,
            presenter,
            wake: Arc::new(wake),
            in_flight: None,
            stage: CaptureStage::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn stage(&self) -> CaptureStage {
        self.stage
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Starts one attempt. Rejected while another is still in flight.
    pub fn start_capture(&mut self, request: CaptureRequest) -> Result<(), StartError> {
        if self.in_flight.is_some() {
            log::warn!("[PIPELINE] Capture requested while busy, ignored");
            return Err(StartError::Busy);
        }

        let rect = request.rect();
        log::info!(
            "[PIPELINE] Starting capture of {}x{} at {},{}",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );

        let indicator = self.presenter.show_indicator(rect);

        let (tx, rx) = mpsc::unbounded_channel();
        let capture = Arc::clone(&self.capture);
        let analysis = Arc::clone(&self.analysis);
        let wake = Arc::clone(&self.wake);

        let task = tauri::async_runtime::spawn(async move {
            let outcome =
                run_guarded(request, capture, analysis, tx.clone(), Arc::clone(&wake)).await;
            // Exactly one terminal event per task.
            let _ = tx.send(PipelineEvent::Finished(outcome));
            wake();
        });

        self.stage = CaptureStage::Capturing;
        self.in_flight = Some(InFlight {
            _task: task,
            events: rx,
            indicator: Some(indicator),
        });
        Ok(())
    }

    /// Drains queued events. Returns `true` when this call delivered the
    /// terminal outcome.
    pub fn pump(&mut self) -> bool {
        loop {
            let Some(in_flight) = self.in_flight.as_mut() else {
                return false;
            };

            match in_flight.events.try_recv() {
                Ok(PipelineEvent::Stage(stage)) => {
                    log::info!("[PIPELINE] Stage: {:?}", stage);
                    self.stage = stage;
                }
                Ok(PipelineEvent::Finished(outcome)) => {
                    self.finish(outcome);
                    return true;
                }
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    let e = PipelineError::Interrupted("task ended without a result".to_string());
                    self.finish(AnalysisOutcome::from(e));
                    return true;
                }
            }
        }
    }

    fn finish(&mut self, outcome: AnalysisOutcome) {
        let Some(mut in_flight) = self.in_flight.take() else {
            return;
        };

        if let Some(indicator) = in_flight.indicator.take() {
            self.presenter.hide_indicator(indicator);
        }

        self.stage = if outcome.is_success() {
            CaptureStage::Succeeded
        } else {
            CaptureStage::Failed
        };
        log::info!("[PIPELINE] Done: {:?}", self.stage);

        self.presenter.show_outcome(outcome);
    }
}

/// Where to put a `width`×`height` indicator on `screen` so it stays out
/// of the pixels about to be captured.
///
/// Tries the screen centre first, then below, above, right of and left of
/// the selection. Falls back to the centre when nothing fits.
pub fn indicator_frame(
    screen: ScreenRect,
    width: u32,
    height: u32,
    clear_of: ScreenRect,
) -> ScreenRect {
    const GAP: i64 = 16;
    let (w, h) = (i64::from(width), i64::from(height));
    let centre_x = i64::from(screen.x) + (i64::from(screen.width) - w) / 2;
    let centre_y = i64::from(screen.y) + (i64::from(screen.height) - h) / 2;

    let candidates = [
        (centre_x, centre_y),
        (centre_x, clear_of.bottom() + GAP),
        (centre_x, i64::from(clear_of.y) - GAP - h),
        (clear_of.right() + GAP, centre_y),
        (i64::from(clear_of.x) - GAP - w, centre_y),
    ];
    let at = |(x, y): (i64, i64)| {
        Some(ScreenRect::new(
            i32::try_from(x).ok()?,
            i32::try_from(y).ok()?,
            width,
            height,
        ))
    };

    candidates
        .into_iter()
        .filter_map(at)
        .find(|frame| screen.contains(frame) && !frame.intersects(&clear_of))
        .or_else(|| at(candidates[0]))
        .unwrap_or(ScreenRect::new(screen.x, screen.y, width, height))
}

/// Runs the pipeline in its own task so a panic inside it still yields
/// a terminal outcome.
async fn run_guarded<C, A>(
    request: CaptureRequest,
    capture: Arc<C>,
    analysis: Arc<A>,
    tx: UnboundedSender<PipelineEvent>,
    wake: WakeFn,
) -> AnalysisOutcome
where
    C: CaptureService,
    A: AnalysisClient,
{
    let report = move |stage: CaptureStage| {
        let _ = tx.send(PipelineEvent::Stage(stage));
        wake();
    };

    let inner = tauri::async_runtime::spawn(run_pipeline(request, capture, analysis, report));
    match inner.await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("[PIPELINE] Task failed: {}", e);
            AnalysisOutcome::from(PipelineError::Interrupted(e.to_string()))
        }
    }
}
