//! Multi-capture bloodweb detector.
//!
//! Every stage runs on all captures of one cycle and only keeps what a
//! quorum of them agrees on.

mod connections;
mod nodes;
mod origin;
mod params;

pub use params::{DetectorParams, IconParams, OriginParams};

use bloodweb_core::{BoardError, BoardImage, DetectionStage};
use image::imageops;
use nalgebra::Point2;

use crate::atlas::{average_normalized, TemplateAtlas};
use crate::circles::Roi;
use crate::consensus::majority;

/// Bloodweb detector over a fixed set of redundant captures.
#[derive(Clone, Debug, Default)]
pub struct Detector {
    params: DetectorParams,
}

impl Detector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Captures required to accept a candidate out of `views`.
    pub fn quorum(&self, views: usize) -> usize {
        match self.params.quorum {
            Some(q) => q.clamp(1, views.max(1)),
            None => majority(views),
        }
    }
}

/// All captures must exist and share one size.
fn check_views(views: &[BoardImage]) -> Result<(), BoardError> {
    let Some(first) = views.first() else {
        return Err(BoardError::inconclusive(
            DetectionStage::Capture,
            "no captures",
        ));
    };
    let size = (first.width(), first.height());
    if let Some(odd) = views.iter().find(|v| (v.width(), v.height()) != size) {
        return Err(BoardError::inconclusive(
            DetectionStage::Capture,
            format!(
                "capture size {}x{} differs from {}x{}",
                odd.width(),
                odd.height(),
                size.0,
                size.1
            ),
        ));
    }
    Ok(())
}

/// Normalized icon patch averaged over the given captures.
fn icon_patch<'a>(
    views: impl Iterator<Item = &'a BoardImage>,
    atlas: &TemplateAtlas,
    center: Point2<f32>,
    half: f32,
) -> Option<Vec<f32>> {
    let patches: Vec<Vec<f32>> = views
        .filter_map(|view| {
            let roi = Roi::around(center, half, view.width(), view.height())?;
            let crop = imageops::crop_imm(view.gray_ref(), roi.x, roi.y, roi.width, roi.height)
                .to_image();
            atlas.normalize(&crop)
        })
        .collect();
    average_normalized(&patches)
}
