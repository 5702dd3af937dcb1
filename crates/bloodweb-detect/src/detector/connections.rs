use std::collections::{BTreeMap, BTreeSet};

use bloodweb_core::{BoardImage, Connection, Node};
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point2;

use super::Detector;
use crate::edges::GradientField;
use crate::lines::{detect_segments, LineParams, LineSegment};

#[cfg(feature = "tracing")]
use tracing::instrument;

impl Detector {
    /// Connections seen in a quorum of captures.
    ///
    /// `nodes` should include the origin. Node discs are masked out of the
    /// edge map, so a segment ends near the rim of each node it joins.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, views, nodes), fields(views = views.len(), nodes = nodes.len()))
    )]
    pub fn detect_connections(&self, views: &[BoardImage], nodes: &[Node]) -> Vec<Connection> {
        if views.is_empty() || nodes.len() < 2 {
            return Vec::new();
        }
        let p = &self.params.lines;
        let snapper = Snapper::new(nodes, p);

        let mut counts: BTreeMap<Connection, usize> = BTreeMap::new();
        for view in views {
            let mut edges = GradientField::sobel(view.gray_ref()).edge_map(p.edge_threshold);
            for n in nodes {
                edges.clear_disc(n.position(), n.radius() + p.mask_margin);
            }
            let segments = detect_segments(&edges, p);
            let seen: BTreeSet<Connection> = segments
                .iter()
                .filter_map(|s| snapper.snap(s))
                .collect();
            log::trace!("{} segments, {} node pairs", segments.len(), seen.len());
            for c in seen {
                *counts.entry(c).or_default() += 1;
            }
        }

        let quorum = self.quorum(views.len());
        let total = counts.len();
        let accepted: Vec<Connection> = counts
            .into_iter()
            .filter(|(_, n)| *n >= quorum)
            .map(|(c, _)| c)
            .collect();
        log::debug!(
            "connections: {} accepted of {} seen, quorum {}/{}",
            accepted.len(),
            total,
            quorum,
            views.len()
        );
        accepted
    }
}

/// Resolves segment ends to the nodes whose masked rim they touch.
struct Snapper<'a> {
    nodes: &'a [Node],
    tree: KdTree<f32, 2>,
    reach: f32,
    slack: f32,
}

impl<'a> Snapper<'a> {
    fn new(nodes: &'a [Node], params: &LineParams) -> Self {
        let coords: Vec<[f32; 2]> = nodes
            .iter()
            .map(|n| [n.position().x, n.position().y])
            .collect();
        let slack = params.mask_margin + params.endpoint_tolerance;
        let reach = nodes.iter().map(|n| n.radius()).fold(0.0f32, f32::max) + slack;
        Self {
            nodes,
            tree: (&coords).into(),
            reach,
            slack,
        }
    }

    fn endpoint(&self, p: Point2<f32>) -> Option<&'a Node> {
        self.tree
            .within::<SquaredEuclidean>(&[p.x, p.y], self.reach * self.reach)
            .into_iter()
            .map(|nn| (&self.nodes[nn.item as usize], nn.distance.sqrt()))
            .find(|(n, d)| *d <= n.radius() + self.slack)
            .map(|(n, _)| n)
    }

    fn snap(&self, seg: &LineSegment) -> Option<Connection> {
        let a = self.endpoint(seg.start)?;
        let b = self.endpoint(seg.end)?;
        Connection::new(a.id().clone(), b.id().clone())
    }
}
