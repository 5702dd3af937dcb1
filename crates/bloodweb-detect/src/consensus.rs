//! Cross-capture agreement.
//!
//! A circle seen in one capture is only trusted once enough other captures
//! show a circle at the same place with a similar radius.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::circles::CircleCandidate;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Max center distance between matching circles, in pixels.
    pub center_tolerance: f32,
    /// Max radius difference between matching circles, in pixels.
    pub radius_tolerance: f32,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            center_tolerance: 8.0,
            radius_tolerance: 8.0,
        }
    }
}

/// Majority of `views` captures.
#[inline]
pub fn majority(views: usize) -> usize {
    views / 2 + 1
}

/// The same circle across captures, at most one member per capture.
#[derive(Clone, Debug, PartialEq)]
pub struct CircleCluster {
    pub center: Point2<f32>,
    pub radius: f32,
    /// `(view index, candidate)` sorted by view index.
    pub members: Vec<(usize, CircleCandidate)>,
}

impl CircleCluster {
    pub fn view_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, view: usize) -> Option<&CircleCandidate> {
        self.members
            .iter()
            .find(|(v, _)| *v == view)
            .map(|(_, c)| c)
    }

    pub fn views(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|(v, _)| *v)
    }
}

/// Group per-capture circles into clusters.
///
/// Seeds are taken strongest first; each seed absorbs the nearest
/// unassigned candidate of every other capture within tolerance.
/// Clusters are returned in reading order (top to bottom, then left to
/// right) regardless of their size; filter by [`CircleCluster::view_count`].
pub fn cluster_views(per_view: &[Vec<CircleCandidate>], params: &ConsensusParams) -> Vec<CircleCluster> {
    let flat: Vec<(usize, CircleCandidate)> = per_view
        .iter()
        .enumerate()
        .flat_map(|(v, cands)| cands.iter().map(move |c| (v, *c)))
        .collect();
    if flat.is_empty() {
        return Vec::new();
    }

    let coords: Vec<[f32; 2]> = flat.iter().map(|(_, c)| [c.center.x, c.center.y]).collect();
    let tree: KdTree<f32, 2> = (&coords).into();

    let mut order: Vec<usize> = (0..flat.len()).collect();
    order.sort_by(|&a, &b| {
        flat[b]
            .1
            .votes
            .total_cmp(&flat[a].1.votes)
            .then(flat[a].0.cmp(&flat[b].0))
            .then(a.cmp(&b))
    });

    let tol2 = params.center_tolerance * params.center_tolerance;
    let mut assigned = vec![false; flat.len()];
    let mut clusters = Vec::new();

    for seed in order {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let (seed_view, seed_cand) = flat[seed];
        let mut members = vec![(seed_view, seed_cand)];

        for nn in tree.within::<SquaredEuclidean>(&coords[seed], tol2) {
            let j = nn.item as usize;
            if assigned[j] {
                continue;
            }
            let (view, cand) = flat[j];
            if members.iter().any(|(v, _)| *v == view) {
                continue;
            }
            if (cand.radius - seed_cand.radius).abs() > params.radius_tolerance {
                continue;
            }
            assigned[j] = true;
            members.push((view, cand));
        }

        members.sort_by_key(|(v, _)| *v);
        let n = members.len() as f32;
        let cx = members.iter().map(|(_, c)| c.center.x).sum::<f32>() / n;
        let cy = members.iter().map(|(_, c)| c.center.y).sum::<f32>() / n;
        let radius = members.iter().map(|(_, c)| c.radius).sum::<f32>() / n;
        clusters.push(CircleCluster {
            center: Point2::new(cx, cy),
            radius,
            members,
        });
    }

    clusters.sort_by(|a, b| {
        a.center
            .y
            .total_cmp(&b.center.y)
            .then(a.center.x.total_cmp(&b.center.x))
    });
    clusters
}

/// Split clusters into those reaching `quorum` captures and the rest.
pub fn apply_quorum(clusters: Vec<CircleCluster>, quorum: usize) -> (Vec<CircleCluster>, Vec<CircleCluster>) {
    clusters.into_iter().partition(|c| c.view_count() >= quorum)
}
