use serde::{Deserialize, Serialize};

use crate::bands::BandTable;
use crate::circles::CircleParams;
use crate::consensus::ConsensusParams;
use crate::lines::LineParams;

/// Where and how to look for the board origin.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginParams {
    /// Expected center in canonical pixels; the image center when `None`.
    pub expected_center: Option<[f32; 2]>,
    /// Max distance of the origin from `expected_center`.
    pub search_radius: f32,
    pub circles: CircleParams,
    /// Min origin-template score for the prestige check.
    pub min_confidence: f32,
}

impl Default for OriginParams {
    fn default() -> Self {
        Self {
            expected_center: None,
            search_radius: 120.0,
            circles: CircleParams::origin(),
            min_confidence: 0.7,
        }
    }
}

/// Icon crop and matching thresholds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IconParams {
    /// Half-side of the icon crop as a fraction of the node radius.
    pub crop_fraction: f32,
    /// Normalized cross-correlation needed to resolve an identity.
    pub min_confidence: f32,
}

impl Default for IconParams {
    fn default() -> Self {
        Self {
            crop_fraction: 0.6,
            min_confidence: 0.7,
        }
    }
}

/// Parameters for [`crate::Detector`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Captures that must agree; majority of the captures when `None`.
    pub quorum: Option<usize>,
    pub origin: OriginParams,
    pub nodes: CircleParams,
    pub consensus: ConsensusParams,
    pub bands: BandTable,
    pub icons: IconParams,
    pub lines: LineParams,
    /// Row height, in canonical pixels, used to order nodes into slots.
    pub row_bucket: f32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            quorum: None,
            origin: OriginParams::default(),
            nodes: CircleParams::nodes(),
            consensus: ConsensusParams::default(),
            bands: BandTable::default(),
            icons: IconParams::default(),
            lines: LineParams::default(),
            row_bucket: 24.0,
        }
    }
}
