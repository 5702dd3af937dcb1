//! Node state from the red channel of the node rim.
//!
//! Each state has a reference red intensity measured on the rim of a node
//! at the canonical resolution. A rim is classified as the nearest
//! reference, or not at all if nothing is close enough.

use std::f32::consts::TAU;

use bloodweb_core::{sample_bilinear, GrayImageView, NodeState};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

const RIM_DIRECTIONS: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateBand {
    pub state: NodeState,
    pub label: String,
    /// Reference mean red intensity of the rim.
    pub red: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandTable {
    pub bands: Vec<StateBand>,
    /// Signatures farther than this from every band stay unclassified.
    pub max_distance: f32,
    /// Rim sampling radii as fractions of the node radius.
    pub rim_fractions: Vec<f32>,
}

impl Default for BandTable {
    fn default() -> Self {
        Self {
            bands: vec![
                StateBand {
                    state: NodeState::Locked,
                    label: "neutral".into(),
                    red: 50.0,
                },
                StateBand {
                    state: NodeState::Unlocked,
                    label: "taupe".into(),
                    red: 140.0,
                },
                StateBand {
                    state: NodeState::Claimed,
                    label: "red".into(),
                    red: 205.0,
                },
            ],
            max_distance: 40.0,
            rim_fractions: vec![0.84, 0.9, 0.96],
        }
    }
}

impl BandTable {
    /// Nearest band within `max_distance`.
    pub fn classify(&self, red_mean: f32) -> Option<&StateBand> {
        self.bands
            .iter()
            .map(|b| (b, (b.red - red_mean).abs()))
            .filter(|(_, d)| *d <= self.max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(b, _)| b)
    }

    /// Mean red intensity on the rim of a circle.
    pub fn rim_signature(
        &self,
        red: &GrayImageView<'_>,
        center: Point2<f32>,
        radius: f32,
    ) -> Option<f32> {
        if radius <= 0.0 || self.rim_fractions.is_empty() {
            return None;
        }
        let mut sum = 0.0f32;
        let mut n = 0usize;
        for &frac in &self.rim_fractions {
            let r = radius * frac;
            for k in 0..RIM_DIRECTIONS {
                let a = TAU * k as f32 / RIM_DIRECTIONS as f32;
                let x = center.x + r * a.cos();
                let y = center.y + r * a.sin();
                if x < 0.0 || y < 0.0 || x > (red.width - 1) as f32 || y > (red.height - 1) as f32 {
                    continue;
                }
                sum += sample_bilinear(red, x, y);
                n += 1;
            }
        }
        (n > 0).then(|| sum / n as f32)
    }
}

/// State agreed on by at least `quorum` captures.
///
/// The most voted state wins, ties going to the least permissive one
/// (`Locked` before `Unlocked` before `Claimed`). Without `quorum` agreeing
/// votes the node is `Locked`, so it is never offered for a claim.
pub fn vote_state(states: &[NodeState], quorum: usize) -> NodeState {
    let order = [NodeState::Locked, NodeState::Unlocked, NodeState::Claimed];
    let mut best = NodeState::Locked;
    let mut best_count = 0;
    for s in order {
        let count = states.iter().filter(|&&x| x == s).count();
        if count > best_count {
            best = s;
            best_count = count;
        }
    }
    if best_count < quorum.max(1) {
        return NodeState::Locked;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_rings_with;

    #[test]
    fn nearest_band_wins() {
        let table = BandTable::default();
        assert_eq!(table.classify(60.0).map(|b| b.state), Some(NodeState::Locked));
        assert_eq!(table.classify(150.0).map(|b| b.state), Some(NodeState::Unlocked));
        assert_eq!(table.classify(240.0).map(|b| b.state), Some(NodeState::Claimed));
        assert_eq!(table.classify(95.0), None);
    }

    #[test]
    fn majority_and_ties() {
        use NodeState::*;
        assert_eq!(vote_state(&[Claimed, Claimed, Unlocked], 2), Claimed);
        assert_eq!(vote_state(&[Unlocked, Unlocked, Claimed], 2), Unlocked);
        assert_eq!(vote_state(&[Unlocked, Unlocked, Locked, Locked], 2), Locked);
        assert_eq!(vote_state(&[Claimed, Claimed, Unlocked, Unlocked], 2), Unlocked);
        assert_eq!(vote_state(&[], 2), Locked);
    }

    #[test]
    fn votes_below_quorum_are_not_claimable() {
        use NodeState::*;
        // One classified capture out of three.
        assert_eq!(vote_state(&[Unlocked], 2), Locked);
        // A split between two captures.
        assert_eq!(vote_state(&[Claimed, Unlocked], 2), Locked);
        assert_eq!(vote_state(&[Unlocked, Claimed, Locked], 2), Locked);
        assert_eq!(vote_state(&[Unlocked], 1), Unlocked);
        assert_eq!(vote_state(&[Claimed], 0), Claimed);
    }

    #[test]
    fn rim_signature_reads_the_ring() {
        let img = draw_rings_with(100, 100, &[([50.0, 50.0], 30.0, 40.0)], 140);
        let view = GrayImageView::from_image(&img);
        let sig = BandTable::default()
            .rim_signature(&view, Point2::new(50.0, 50.0), 40.0)
            .unwrap();
        approx::assert_abs_diff_eq!(sig, 140.0, epsilon = 3.0);
    }
}
