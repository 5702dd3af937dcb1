use std::cmp::Ordering;

use bloodweb_core::{BoardGraph, Node, NodeId};

use crate::SelectorParams;

/// Score of one claimable node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: NodeId,
    pub desirability: i64,
    /// Hops from the anchor; the node count when unreachable.
    pub anchor_hops: usize,
    /// Node whose value produced the desirability (the candidate itself or
    /// something it leads to).
    pub target: NodeId,
}

impl Candidate {
    /// Best first: higher desirability, then fewer anchor hops, then lower id.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .desirability
            .cmp(&self.desirability)
            .then(self.anchor_hops.cmp(&other.anchor_hops))
            .then(self.id.cmp(&other.id))
    }
}

fn open(n: &Node) -> bool {
    !n.is_claimed() && !n.is_origin()
}

/// Score every claimable node of `graph`, best first.
///
/// `anchor` is the last claimed node; the origin when `None` or not on
/// this board.
pub fn rank_candidates(
    graph: &BoardGraph,
    anchor: Option<&NodeId>,
    params: &SelectorParams,
) -> Vec<Candidate> {
    let anchor = anchor
        .filter(|id| graph.contains(id))
        .unwrap_or_else(|| graph.origin().id());
    let from_anchor = graph.hop_distances(anchor);
    let unreachable = graph.len();

    let mut out: Vec<Candidate> = graph
        .claimable()
        .map(|c| {
            let reach = graph.hop_distances_through(c.id(), open);
            let (desire, target) = reach
                .iter()
                .filter_map(|(id, &hops)| graph.node(id).filter(|n| open(n)).map(|n| (n, hops)))
                .map(|(n, hops)| {
                    let score = i64::from(n.value())
                        .saturating_sub(params.lookahead_hop_penalty.saturating_mul(hops as i64));
                    (score, n.id())
                })
                // Equal scores: the lowest id wins.
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(a.1)))
                .unwrap_or((i64::from(c.value()), c.id()));

            let anchor_hops = from_anchor.get(c.id()).copied().unwrap_or(unreachable);
            Candidate {
                id: c.id().clone(),
                desirability: desire
                    .saturating_sub(params.anchor_hop_penalty.saturating_mul(anchor_hops as i64)),
                anchor_hops,
                target: target.clone(),
            }
        })
        .collect();

    out.sort_by(Candidate::rank);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodweb_core::{Connection, NodeBuilder, NodeState};
    use nalgebra::Point2;

    fn node(slot: u32, state: NodeState, value: i32) -> bloodweb_core::Node {
        NodeBuilder::new(slot, Point2::new(slot as f32, 0.0))
            .suffix(format!("n{slot}"))
            .state(state)
            .value(value)
            .build()
            .unwrap()
    }

    fn id(slot: u32) -> NodeId {
        if slot == 0 {
            NodeId::origin()
        } else {
            NodeId::new(slot, format!("n{slot}"))
        }
    }

    fn graph(nodes: Vec<bloodweb_core::Node>, edges: &[(u32, u32)]) -> BoardGraph {
        let origin = NodeBuilder::origin(Point2::new(0.0, 0.0)).build().unwrap();
        let conns: Vec<Connection> = edges
            .iter()
            .map(|&(a, b)| Connection::new(id(a), id(b)).unwrap())
            .collect();
        BoardGraph::build(origin, nodes, &conns).unwrap()
    }

    #[test]
    fn lookahead_prefers_the_path_to_a_big_reward() {
        // O-1(10)-3(1000) and O-2(100).
        let g = graph(
            vec![
                node(1, NodeState::Unlocked, 10),
                node(2, NodeState::Unlocked, 100),
                node(3, NodeState::Locked, 1000),
            ],
            &[(0, 1), (0, 2), (1, 3)],
        );
        let ranked = rank_candidates(&g, None, &SelectorParams::default());
        assert_eq!(ranked[0].id, id(1));
        assert_eq!(ranked[0].target, id(3));
        assert_eq!(ranked[0].desirability, 1000 - 50 - 10);
        assert_eq!(ranked[1].desirability, 100 - 10);
    }

    #[test]
    fn greedy_ignores_what_lies_behind() {
        let g = graph(
            vec![
                node(1, NodeState::Unlocked, 10),
                node(2, NodeState::Unlocked, 100),
                node(3, NodeState::Locked, 1000),
            ],
            &[(0, 1), (0, 2), (1, 3)],
        );
        let ranked = rank_candidates(&g, None, &SelectorParams::greedy());
        assert_eq!(ranked[0].id, id(2));
    }

    #[test]
    fn claimed_nodes_block_the_lookahead() {
        // 1 -> 2(claimed) -> 3(1000): 3 is not reachable through 2.
        let g = graph(
            vec![
                node(1, NodeState::Unlocked, 10),
                node(2, NodeState::Claimed, 0),
                node(3, NodeState::Locked, 1000),
            ],
            &[(0, 1), (1, 2), (2, 3)],
        );
        let ranked = rank_candidates(&g, None, &SelectorParams::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].target, id(1));
    }

    #[test]
    fn ties_go_to_the_closer_then_lower_id() {
        // All worth 100; 2 is one hop from the anchor, 3 and 4 are two.
        let g = graph(
            vec![
                node(1, NodeState::Claimed, 0),
                node(2, NodeState::Unlocked, 100),
                node(3, NodeState::Unlocked, 100),
                node(4, NodeState::Unlocked, 100),
            ],
            &[(0, 1), (1, 2), (0, 3), (0, 4)],
        );
        let flat = SelectorParams {
            lookahead_hop_penalty: 1000,
            anchor_hop_penalty: 0,
        };
        let ranked = rank_candidates(&g, Some(&id(1)), &flat);
        let order: Vec<_> = ranked.iter().map(|c| c.id.slot).collect();
        assert_eq!(order, vec![2, 3, 4]);
        assert_eq!(ranked[0].anchor_hops, 1);
        assert_eq!(ranked[1].anchor_hops, 2);
    }

    #[test]
    fn unknown_anchor_falls_back_to_origin() {
        let g = graph(vec![node(1, NodeState::Unlocked, 10)], &[(0, 1)]);
        let ranked = rank_candidates(&g, Some(&NodeId::new(77, "gone")), &SelectorParams::default());
        assert_eq!(ranked[0].anchor_hops, 1);
    }
}
