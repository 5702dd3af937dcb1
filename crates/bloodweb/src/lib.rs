//! Facade crate for the `bloodweb-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, detector and selector crates,
//! - [`detect_board`] / [`plan_claims`]: captures in, graph and claim order out,
//! - the control loop: [`Worker`] driving a [`ScreenCapture`] and a
//!   [`PointerDriver`], and [`WorkerHandle`] running it on its own thread,
//! - [`io`]: JSON config, template pack loading and reports.
//!
//! ## Quickstart
//!
//! ```no_run
//! use bloodweb::io::{load_captures, BloodwebConfig};
//! use bloodweb::{detect_board, plan_claims, NoopObserver};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = BloodwebConfig::load_json("bloodweb.json")?;
//! let atlas = cfg.load_atlas(Path::new("."))?;
//! let views = load_captures(&[PathBuf::from("capture.png")], &cfg.screen_scale())?;
//!
//! let mut graph = detect_board(&cfg.build_detector(), &atlas, &views, &mut NoopObserver)?;
//! for round in plan_claims(&mut graph, cfg.selector, &mut NoopObserver) {
//!     println!("{}: {}", round.index, round.node);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `bloodweb::core`: image view, nodes, board graph, screen scale, errors.
//! - `bloodweb::detect`: circles, state bands, icon atlas, line segments.
//! - `bloodweb::select`: claim selection.

pub use bloodweb_core as core;
pub use bloodweb_detect as detect;
pub use bloodweb_select as select;

pub use bloodweb_core::{
    BoardError, BoardGraph, BoardImage, BoardObserver, Node, NodeId, NodeRecord, NodeState,
    NoopObserver, RecordingObserver, Resolution, ScreenScale,
};
pub use bloodweb_detect::{Detector, DetectorParams, TemplateAtlas};
pub use bloodweb_select::{Round, Selector, SelectorParams};

mod control;
mod handle;
pub mod io;
mod pipeline;

pub use control::{
    CycleOutcome, PointerDriver, ScreenCapture, Timing, Worker, WorkerError, WorkerParams,
};
pub use handle::WorkerHandle;
pub use pipeline::{detect_board, plan_claims};
