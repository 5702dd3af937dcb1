use bloodweb_core::{BoardError, BoardImage, DetectionStage, Identity, Node, NodeBuilder, NodeState};

use super::{check_views, icon_patch, Detector};
use crate::atlas::TemplateAtlas;
use crate::bands::vote_state;
use crate::circles::{detect_circles, CircleCandidate};
use crate::consensus::{apply_quorum, cluster_views, CircleCluster};

#[cfg(feature = "tracing")]
use tracing::instrument;

impl Detector {
    /// Detect every non-origin node.
    ///
    /// Slots are assigned in reading order starting at 1. Nodes whose icon
    /// does not clear the confidence threshold keep an unresolved identity
    /// and the atlas fallback value.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, views, origin, atlas), fields(views = views.len(), templates = atlas.len()))
    )]
    pub fn detect_nodes(
        &self,
        views: &[BoardImage],
        origin: &Node,
        atlas: &TemplateAtlas,
    ) -> Result<Vec<Node>, BoardError> {
        check_views(views)?;
        let p = &self.params;

        let per_view: Vec<Vec<CircleCandidate>> = views
            .iter()
            .map(|view| {
                detect_circles(view.gray_ref(), &p.nodes)
                    .into_iter()
                    .filter(|c| (c.center - origin.position()).norm() >= origin.radius() + c.radius)
                    .collect()
            })
            .collect();

        let quorum = self.quorum(views.len());
        let (mut accepted, rejected) =
            apply_quorum(cluster_views(&per_view, &p.consensus), quorum);
        log::debug!(
            "nodes: {} accepted at quorum {}/{}, {} below",
            accepted.len(),
            quorum,
            views.len(),
            rejected.len()
        );

        let bucket = p.row_bucket.max(1.0);
        accepted.sort_by(|a, b| {
            let ra = (a.center.y / bucket).round() as i64;
            let rb = (b.center.y / bucket).round() as i64;
            ra.cmp(&rb).then(a.center.x.total_cmp(&b.center.x))
        });

        accepted
            .iter()
            .enumerate()
            .map(|(i, cluster)| self.build_node(i as u32 + 1, cluster, views, atlas))
            .collect()
    }

    fn build_node(
        &self,
        slot: u32,
        cluster: &CircleCluster,
        views: &[BoardImage],
        atlas: &TemplateAtlas,
    ) -> Result<Node, BoardError> {
        let state = self.classify_state(slot, cluster, views);

        let half = cluster.radius * self.params.icons.crop_fraction;
        let patch = icon_patch(
            cluster.views().map(|v| &views[v]),
            atlas,
            cluster.center,
            half,
        );
        let best = patch.as_deref().and_then(|p| atlas.best_match(p));

        let (identity, value) = match best {
            Some(m) if m.score >= self.params.icons.min_confidence => {
                (Identity::resolved(&m.entry.identity), m.entry.value)
            }
            other => {
                log::debug!(
                    "slot {slot}: icon unresolved (best {:.2})",
                    other.map_or(f32::NAN, |m| m.score)
                );
                (Identity::Unresolved, atlas.fallback_value())
            }
        };

        NodeBuilder::new(slot, cluster.center)
            .radius(cluster.radius)
            .state(state)
            .identity(identity)
            .value(value)
            .build()
            .map_err(|e| BoardError::inconclusive(DetectionStage::Nodes, e.to_string()))
    }

    /// Per-capture band classification, then a vote that needs the same
    /// quorum as the circle itself.
    fn classify_state(
        &self,
        slot: u32,
        cluster: &CircleCluster,
        views: &[BoardImage],
    ) -> NodeState {
        let bands = &self.params.bands;
        let votes: Vec<NodeState> = cluster
            .members
            .iter()
            .filter_map(|(v, cand)| {
                let sig = bands.rim_signature(&views[*v].red_view(), cand.center, cand.radius)?;
                bands.classify(sig).map(|b| b.state)
            })
            .collect();
        let quorum = self.quorum(views.len());
        let state = vote_state(&votes, quorum);
        if state == NodeState::Locked && !votes.iter().all(|s| *s == NodeState::Locked) {
            log::debug!("slot {slot}: state votes {votes:?} below quorum {quorum}, kept locked");
        }
        state
    }
}
