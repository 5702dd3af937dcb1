//! Bloodweb detection from redundant screen captures.
//!
//! The pipeline, per capture cycle:
//! 1. [`Detector::locate_origin`]: Hough circles in a window around the
//!    expected board center, agreed on by a quorum of captures,
//! 2. [`Detector::detect_nodes`]: Hough circles over the whole capture,
//!    [`BandTable`] state classification from the red channel and icon
//!    matching against a [`TemplateAtlas`],
//! 3. [`Detector::detect_connections`]: Hough line segments on the edge map
//!    with node discs masked out, snapped to node rims.
//!
//! Low-level building blocks ([`detect_circles`], [`cluster_views`],
//! [`detect_segments`]) are public for tooling and tests.

mod atlas;
mod bands;
mod circles;
mod consensus;
mod detector;
mod edges;
mod lines;
#[cfg(test)]
mod test_utils;

pub use atlas::{
    average_normalized, AtlasError, IconMatch, OriginMatch, OriginTemplate, TemplateAtlas,
    TemplateEntry,
};
pub use bands::{vote_state, BandTable, StateBand};
pub use circles::{detect_circles, detect_circles_in, CircleCandidate, CircleParams, Roi};
pub use consensus::{apply_quorum, cluster_views, majority, CircleCluster, ConsensusParams};
pub use detector::{Detector, DetectorParams, IconParams, OriginParams};
pub use edges::{EdgeMap, GradientField};
pub use lines::{detect_segments, hough_lines, segments_on_line, HoughLine, LineParams, LineSegment};
