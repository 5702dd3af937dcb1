//! Capture, detect, select and click until the board is cleared.
//!
//! Screen access and synthetic input are behind [`ScreenCapture`] and
//! [`PointerDriver`]; everything else runs on canonical-resolution images.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bloodweb_core::{
    BoardError, BoardGraph, BoardImage, BoardObserver, DetectionStage, NodeId, NoopObserver,
    ScreenScale,
};
use bloodweb_detect::{Detector, TemplateAtlas};
use bloodweb_select::{Selector, SelectorParams};
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::detect_board;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Source of board-region screenshots at native resolution.
pub trait ScreenCapture {
    fn capture(&mut self) -> Result<RgbImage, WorkerError>;
}

/// Synthetic pointer input in absolute screen pixels.
pub trait PointerDriver {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), WorkerError>;
    fn press(&mut self) -> Result<(), WorkerError>;
    fn release(&mut self) -> Result<(), WorkerError>;
    /// Press and release at the current position.
    fn click(&mut self) -> Result<(), WorkerError>;
}

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("pointer input failed: {0}")]
    Pointer(String),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("no usable board after {attempts} capture attempt(s): {last}")]
    GaveUp { attempts: usize, last: BoardError },
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("worker thread panicked")]
    Panicked,
}

impl WorkerError {
    /// A board that is not a regular bloodweb; the worker pauses.
    pub fn is_pause(&self) -> bool {
        matches!(self, WorkerError::Board(BoardError::UnexpectedBoardState(_)))
    }
}

/// Fixed delays of the claim sequence, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Button held on the node before moving away.
    pub hold_ms: u64,
    /// Away from the node, still pressed.
    pub release_delay_ms: u64,
    /// Extra wait before dismissing a mystery box.
    pub mystery_box_delay_ms: u64,
    /// After every claim.
    pub settle_ms: u64,
    /// Before the click that advances to the next level.
    pub level_clear_delay_ms: u64,
}

impl Timing {
    pub const GAME: Timing = Timing {
        hold_ms: 100,
        release_delay_ms: 400,
        mystery_box_delay_ms: 900,
        settle_ms: 500,
        level_clear_delay_ms: 2000,
    };

    /// No waiting at all, for replays and tests.
    pub const ZERO: Timing = Timing {
        hold_ms: 0,
        release_delay_ms: 0,
        mystery_box_delay_ms: 0,
        settle_ms: 0,
        level_clear_delay_ms: 0,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::GAME
    }
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerParams {
    /// Captures per detection attempt.
    pub capture_count: usize,
    /// Detection attempts before a cycle gives up.
    pub max_capture_attempts: usize,
    pub selector: SelectorParams,
    pub timing: Timing,
}

impl Default for WorkerParams {
    fn default() -> Self {
        Self {
            capture_count: 3,
            max_capture_attempts: 5,
            selector: SelectorParams::default(),
            timing: Timing::GAME,
        }
    }
}

/// How a capture cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Board exhausted and the level-clear click sent.
    Cleared { claims: usize },
    /// Stop requested; `claims` were made before it was seen.
    Stopped { claims: usize },
}

pub struct Worker<C, P, O = NoopObserver> {
    detector: Detector,
    atlas: TemplateAtlas,
    params: WorkerParams,
    scale: ScreenScale,
    capture: C,
    pointer: P,
    observer: O,
    stop: Arc<AtomicBool>,
}

impl<C: ScreenCapture, P: PointerDriver> Worker<C, P> {
    pub fn new(
        detector: Detector,
        atlas: TemplateAtlas,
        params: WorkerParams,
        scale: ScreenScale,
        capture: C,
        pointer: P,
    ) -> Self {
        Self {
            detector,
            atlas,
            params,
            scale,
            capture,
            pointer,
            observer: NoopObserver,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<C: ScreenCapture, P: PointerDriver, O: BoardObserver> Worker<C, P, O> {
    pub fn with_observer<O2: BoardObserver>(self, observer: O2) -> Worker<C, P, O2> {
        Worker {
            detector: self.detector,
            atlas: self.atlas,
            params: self.params,
            scale: self.scale,
            capture: self.capture,
            pointer: self.pointer,
            observer,
            stop: self.stop,
        }
    }

    #[inline]
    pub fn params(&self) -> &WorkerParams {
        &self.params
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    /// Shared flag; once raised the worker stops at the next round boundary.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[inline]
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// `capture_count` screenshots, rescaled into the canonical resolution.
    pub fn capture_views(&mut self) -> Result<Vec<BoardImage>, WorkerError> {
        let n = self.params.capture_count.max(1);
        let mut views = Vec::with_capacity(n);
        for _ in 0..n {
            let raw = self.capture.capture()?;
            views.push(BoardImage::new(raw).resized(self.scale.ratio));
        }
        Ok(views)
    }

    /// Capture and detect until a graph is built.
    ///
    /// Recoverable failures re-capture up to `max_capture_attempts` times;
    /// an unexpected board state is returned at once. `Ok(None)` if a stop
    /// was requested in between.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn detect(&mut self) -> Result<Option<BoardGraph>, WorkerError> {
        let attempts = self.params.max_capture_attempts.max(1);
        let mut last = BoardError::inconclusive(DetectionStage::Capture, "no capture taken");
        for attempt in 1..=attempts {
            if self.should_stop() {
                return Ok(None);
            }
            let views = self.capture_views()?;
            match detect_board(&self.detector, &self.atlas, &views, &mut self.observer) {
                Ok(graph) => return Ok(Some(graph)),
                Err(e) if e.is_recoverable() => {
                    warn!("attempt {attempt}/{attempts}: {e}");
                    last = e;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(WorkerError::GaveUp { attempts, last })
    }

    /// Input sequence for one claim on the board.
    fn claim(&mut self, graph: &BoardGraph, id: &NodeId) -> Result<(), WorkerError> {
        let Some(node) = graph.node(id) else {
            return Err(BoardError::MalformedGraph(format!("selected unknown node {id}")).into());
        };
        let [x, y] = self.scale.to_screen(node.position());
        let t = self.params.timing;

        self.pointer.move_to(x, y)?;
        self.pointer.press()?;
        pause(t.hold_ms);
        self.pointer.move_to(0, 0)?;
        pause(t.release_delay_ms);
        self.pointer.release()?;

        if node.is_mystery_box() {
            pause(t.mystery_box_delay_ms);
            self.pointer.click()?;
        }
        pause(t.settle_ms);
        Ok(())
    }

    /// One capture, detect, build and claim cycle.
    ///
    /// The stop flag is checked before each round.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, WorkerError> {
        let Some(mut graph) = self.detect()? else {
            return Ok(CycleOutcome::Stopped { claims: 0 });
        };
        let mut selector = Selector::new(self.params.selector);
        loop {
            if self.should_stop() {
                return Ok(CycleOutcome::Stopped {
                    claims: selector.rounds(),
                });
            }
            let Some(next) = selector.select_next(&graph) else {
                break;
            };
            self.claim(&graph, &next)?;
            selector.apply_claim(&mut graph, &next);
            self.observer.on_round(selector.rounds(), &next, &graph);
        }

        let claims = selector.rounds();
        info!("level cleared after {claims} claim(s)");
        self.observer.on_cleared(claims);
        pause(self.params.timing.level_clear_delay_ms);
        self.pointer.click()?;
        Ok(CycleOutcome::Cleared { claims })
    }

    /// Clear boards until stopped.
    ///
    /// Cycles that give up are retried; pointer, capture and unexpected
    /// board errors end the loop.
    pub fn run(&mut self) -> Result<(), WorkerError> {
        let mut cleared = 0usize;
        while !self.should_stop() {
            match self.run_cycle() {
                Ok(CycleOutcome::Cleared { .. }) => cleared += 1,
                Ok(CycleOutcome::Stopped { .. }) => break,
                Err(WorkerError::GaveUp { attempts, last }) => {
                    warn!("cycle abandoned after {attempts} attempt(s): {last}");
                }
                Err(e) => {
                    if e.is_pause() {
                        info!("pausing: {e}");
                    }
                    return Err(e);
                }
            }
        }
        debug!("worker stopped after {cleared} board(s)");
        Ok(())
    }
}
