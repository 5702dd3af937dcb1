//! Connectivity graph of one board instance.

use std::collections::{BTreeSet, HashMap};

use log::debug;
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::NodeFiltered;
use serde::{Deserialize, Serialize};

use crate::{BoardError, Node, NodeId, NodeRecord};

/// Unordered edge between two distinct nodes, stored lower id first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    a: NodeId,
    b: NodeId,
}

impl Connection {
    /// `None` for a self-loop.
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        use std::cmp::Ordering;
        match a.cmp(&b) {
            Ordering::Less => Some(Self { a, b }),
            Ordering::Greater => Some(Self { a: b, b: a }),
            Ordering::Equal => None,
        }
    }

    #[inline]
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        (&self.a, &self.b)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        &self.a == id || &self.b == id
    }

    /// The endpoint opposite to `id`.
    pub fn other(&self, id: &NodeId) -> Option<&NodeId> {
        if &self.a == id {
            Some(&self.b)
        } else if &self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Nodes plus connections for one capture cycle.
///
/// Ids, positions and connections are fixed at [`BoardGraph::build`]; only
/// claim state changes afterwards, through [`BoardGraph::mark_claimed`] and
/// [`BoardGraph::mark_accessible`].
#[derive(Clone, Debug)]
pub struct BoardGraph {
    graph: UnGraph<Node, ()>,
    index: HashMap<NodeId, NodeIndex>,
    origin: NodeIndex,
    connections: Vec<Connection>,
}

impl BoardGraph {
    /// Merge the origin into the node set and attach connections.
    ///
    /// Fails with [`BoardError::MalformedGraph`] on a missing endpoint, a
    /// self-loop, a duplicate id, or more than one origin. Duplicate
    /// connections collapse into one.
    pub fn build(
        origin: Node,
        nodes: Vec<Node>,
        connections: &[Connection],
    ) -> Result<Self, BoardError> {
        if !origin.is_origin() {
            return Err(BoardError::MalformedGraph(format!(
                "node {} is not an origin",
                origin.id()
            )));
        }

        let mut graph = UnGraph::with_capacity(nodes.len() + 1, connections.len());
        let mut index = HashMap::with_capacity(nodes.len() + 1);

        let origin_id = origin.id().clone();
        let origin_ix = graph.add_node(origin);
        index.insert(origin_id, origin_ix);

        for node in nodes {
            if node.is_origin() {
                return Err(BoardError::MalformedGraph(format!(
                    "second origin {}",
                    node.id()
                )));
            }
            if index.contains_key(node.id()) {
                return Err(BoardError::MalformedGraph(format!(
                    "duplicate node id {}",
                    node.id()
                )));
            }
            let id = node.id().clone();
            let ix = graph.add_node(node);
            index.insert(id, ix);
        }

        let unique: BTreeSet<&Connection> = connections.iter().collect();
        let mut kept = Vec::with_capacity(unique.len());
        for c in unique {
            if c.a == c.b {
                return Err(BoardError::MalformedGraph(format!("self-loop on {}", c.a)));
            }
            let ia = lookup(&index, &c.a)?;
            let ib = lookup(&index, &c.b)?;
            graph.add_edge(ia, ib, ());
            kept.push(c.clone());
        }

        debug!(
            "board graph: {} nodes, {} connections",
            graph.node_count(),
            kept.len()
        );

        Ok(Self {
            graph,
            index,
            origin: origin_ix,
            connections: kept,
        })
    }

    #[inline]
    pub fn origin(&self) -> &Node {
        &self.graph[self.origin]
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&ix| &self.graph[ix])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes, origin first, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |ix| &self.graph[ix])
    }

    /// Accessible, unclaimed, non-origin nodes.
    pub fn claimable(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes().filter(|n| n.is_claimable())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    #[inline]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Direct neighbors of `id`, sorted by id.
    pub fn neighbors(&self, id: &NodeId) -> Vec<&NodeId> {
        let Some(&ix) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&NodeId> = self
            .graph
            .neighbors(ix)
            .map(|n| self.graph[n].id())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Shortest hop count from `from` to every reachable node.
    pub fn hop_distances(&self, from: &NodeId) -> HashMap<NodeId, usize> {
        let Some(&start) = self.index.get(from) else {
            return HashMap::new();
        };
        self.collect_ids(dijkstra(&self.graph, start, None, |_| 1usize))
    }

    /// Shortest hop count from `from`, only stepping onto nodes accepted by `passable`.
    ///
    /// `from` itself is always part of the walk.
    pub fn hop_distances_through<F>(&self, from: &NodeId, passable: F) -> HashMap<NodeId, usize>
    where
        F: Fn(&Node) -> bool,
    {
        let Some(&start) = self.index.get(from) else {
            return HashMap::new();
        };
        let filtered = NodeFiltered::from_fn(&self.graph, |ix: NodeIndex| {
            ix == start || passable(&self.graph[ix])
        });
        self.collect_ids(dijkstra(&filtered, start, None, |_| 1usize))
    }

    /// Claim `id`: sets the claimed flag and the sentinel value.
    ///
    /// Returns `false` for unknown ids, the origin, or an already claimed node.
    pub fn mark_claimed(&mut self, id: &NodeId) -> bool {
        match self.index.get(id) {
            Some(&ix) => self.graph[ix].claim(),
            None => false,
        }
    }

    /// Make `id` accessible; returns `false` if nothing changed.
    pub fn mark_accessible(&mut self, id: &NodeId) -> bool {
        match self.index.get(id) {
            Some(&ix) => self.graph[ix].unlock(),
            None => false,
        }
    }

    /// Node records sorted by id.
    pub fn records(&self) -> Vec<NodeRecord> {
        let mut nodes: Vec<&Node> = self.nodes().collect();
        nodes.sort_by(|a, b| a.id().cmp(b.id()));
        nodes.into_iter().map(Node::record).collect()
    }

    fn collect_ids(&self, dist: HashMap<NodeIndex, usize>) -> HashMap<NodeId, usize> {
        dist.into_iter()
            .map(|(ix, d)| (self.graph[ix].id().clone(), d))
            .collect()
    }
}

fn lookup(index: &HashMap<NodeId, NodeIndex>, id: &NodeId) -> Result<NodeIndex, BoardError> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| BoardError::MalformedGraph(format!("connection endpoint {id} not on board")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeBuilder, NodeState, CLAIMED_VALUE};
    use nalgebra::Point2;

    fn origin() -> Node {
        NodeBuilder::origin(Point2::new(0.0, 0.0)).build().unwrap()
    }

    fn node(slot: u32, state: NodeState, value: i32) -> Node {
        NodeBuilder::new(slot, Point2::new(slot as f32 * 10.0, 0.0))
            .suffix(format!("n{slot}"))
            .state(state)
            .value(value)
            .build()
            .unwrap()
    }

    fn id(slot: u32) -> NodeId {
        NodeId::new(slot, format!("n{slot}"))
    }

    fn conn(a: &NodeId, b: &NodeId) -> Connection {
        Connection::new(a.clone(), b.clone()).unwrap()
    }

    #[test]
    fn connection_is_unordered_and_rejects_self_loops() {
        let a = id(1);
        let b = id(2);
        assert_eq!(conn(&a, &b), conn(&b, &a));
        assert!(Connection::new(a.clone(), a.clone()).is_none());
        assert_eq!(conn(&b, &a).other(&a), Some(&b));
        assert_eq!(conn(&b, &a).other(&id(3)), None);
    }

    #[test]
    fn build_merges_origin_and_dedups_connections() {
        let o = NodeId::origin();
        let g = BoardGraph::build(
            origin(),
            vec![node(1, NodeState::Unlocked, 5), node(2, NodeState::Locked, 7)],
            &[conn(&o, &id(1)), conn(&id(1), &o), conn(&id(1), &id(2))],
        )
        .unwrap();

        assert_eq!(g.len(), 3);
        assert_eq!(g.connections().len(), 2);
        assert_eq!(g.nodes().filter(|n| n.is_origin()).count(), 1);
        assert!(g.origin().is_accessible());
        assert_eq!(g.neighbors(&id(1)), vec![&o, &id(2)]);
        for c in g.connections() {
            let (a, b) = c.endpoints();
            assert!(g.contains(a) && g.contains(b) && a != b);
        }
    }

    #[test]
    fn build_rejects_missing_endpoint() {
        let err = BoardGraph::build(
            origin(),
            vec![node(1, NodeState::Unlocked, 5)],
            &[conn(&id(1), &id(9))],
        )
        .unwrap_err();
        assert!(matches!(err, BoardError::MalformedGraph(_)));
    }

    #[test]
    fn build_rejects_duplicate_ids_and_second_origin() {
        let dup = BoardGraph::build(
            origin(),
            vec![node(1, NodeState::Locked, 0), node(1, NodeState::Locked, 0)],
            &[],
        );
        assert!(matches!(dup, Err(BoardError::MalformedGraph(_))));

        let two = BoardGraph::build(origin(), vec![origin()], &[]);
        assert!(matches!(two, Err(BoardError::MalformedGraph(_))));

        let not_origin = BoardGraph::build(node(1, NodeState::Locked, 0), vec![], &[]);
        assert!(matches!(not_origin, Err(BoardError::MalformedGraph(_))));
    }

    #[test]
    fn hop_distances_follow_connections() {
        let o = NodeId::origin();
        let g = BoardGraph::build(
            origin(),
            vec![
                node(1, NodeState::Unlocked, 0),
                node(2, NodeState::Locked, 0),
                node(3, NodeState::Locked, 0),
                node(4, NodeState::Locked, 0),
            ],
            &[conn(&o, &id(1)), conn(&id(1), &id(2)), conn(&id(2), &id(3))],
        )
        .unwrap();

        let d = g.hop_distances(&o);
        assert_eq!(d[&o], 0);
        assert_eq!(d[&id(3)], 3);
        assert!(!d.contains_key(&id(4)));

        let through = g.hop_distances_through(&id(1), |n| n.id() != &id(2));
        assert_eq!(through[&id(1)], 0);
        assert!(!through.contains_key(&id(3)));
    }

    #[test]
    fn claim_is_monotonic_and_sets_sentinel() {
        let o = NodeId::origin();
        let mut g = BoardGraph::build(
            origin(),
            vec![node(1, NodeState::Unlocked, 42)],
            &[conn(&o, &id(1))],
        )
        .unwrap();

        assert!(g.mark_claimed(&id(1)));
        assert!(!g.mark_claimed(&id(1)));
        let n = g.node(&id(1)).unwrap();
        assert!(n.is_claimed());
        assert_eq!(n.value(), CLAIMED_VALUE);

        assert!(!g.mark_claimed(&o));
        assert!(!g.mark_claimed(&id(7)));
        assert!(!g.mark_accessible(&id(1)));
        assert_eq!(g.claimable().count(), 0);
    }

    #[test]
    fn records_are_sorted_by_id() {
        let g = BoardGraph::build(
            origin(),
            vec![node(12, NodeState::Locked, 0), node(3, NodeState::Locked, 0)],
            &[],
        )
        .unwrap();
        let ids: Vec<String> = g.records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["0_origin", "3_n3", "12_n12"]);
    }
}
