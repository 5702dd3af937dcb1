//! Core types for bloodweb board reconstruction.
//!
//! This crate holds everything the detector and the selector agree on:
//! - [`BoardImage`]: one capture with its color, grayscale and red planes,
//! - [`Node`] / [`NodeBuilder`]: one board position and its claim state,
//! - [`Connection`] / [`BoardGraph`]: the validated connectivity graph,
//! - [`ScreenScale`]: mapping between native screen pixels and the canonical
//!   2560-wide reference resolution,
//! - [`BoardError`]: the shared error taxonomy,
//! - [`BoardObserver`]: the optional debug sink.
//!
//! It does *not* detect anything and does not choose nodes.

mod board_image;
mod error;
mod graph;
mod logger;
mod node;
mod observer;
mod scale;

pub use board_image::{sample_bilinear, sample_bilinear_u8, BoardImage, GrayImageView};
pub use error::{BoardError, DetectionStage};
pub use graph::{BoardGraph, Connection};
pub use node::{
    Identity, Node, NodeBuildError, NodeBuilder, NodeId, NodeRecord, NodeState, CLAIMED_VALUE,
    MYSTERY_BOX,
};
pub use observer::{BoardObserver, NoopObserver, RecordingObserver};
pub use scale::{Resolution, ScreenScale, REFERENCE_HEIGHT, REFERENCE_UI_SCALE, REFERENCE_WIDTH};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
