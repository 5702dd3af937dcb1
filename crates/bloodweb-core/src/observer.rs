//! Optional debug sink notified after each core step.

use crate::{BoardGraph, Connection, Node, NodeId, NodeRecord};

/// Observer for raw detections, built graphs and selector rounds.
///
/// Every method has an empty default; the core never reads anything back.
pub trait BoardObserver {
    fn on_detections(&mut self, _origin: &Node, _nodes: &[Node], _connections: &[Connection]) {}

    fn on_graph(&mut self, _graph: &BoardGraph) {}

    fn on_round(&mut self, _round: usize, _chosen: &NodeId, _graph: &BoardGraph) {}

    fn on_cleared(&mut self, _rounds: usize) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl BoardObserver for NoopObserver {}

/// Observer that keeps snapshots in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    pub raw_nodes: usize,
    pub raw_connections: usize,
    pub graphs: Vec<Vec<NodeRecord>>,
    pub rounds: Vec<(usize, NodeId)>,
    pub cleared: Vec<usize>,
}

impl BoardObserver for RecordingObserver {
    fn on_detections(&mut self, _origin: &Node, nodes: &[Node], connections: &[Connection]) {
        self.raw_nodes += nodes.len();
        self.raw_connections += connections.len();
    }

    fn on_graph(&mut self, graph: &BoardGraph) {
        self.graphs.push(graph.records());
    }

    fn on_round(&mut self, round: usize, chosen: &NodeId, graph: &BoardGraph) {
        self.rounds.push((round, chosen.clone()));
        self.graphs.push(graph.records());
    }

    fn on_cleared(&mut self, rounds: usize) {
        self.cleared.push(rounds);
    }
}

impl<T: BoardObserver + ?Sized> BoardObserver for &mut T {
    fn on_detections(&mut self, origin: &Node, nodes: &[Node], connections: &[Connection]) {
        (**self).on_detections(origin, nodes, connections)
    }

    fn on_graph(&mut self, graph: &BoardGraph) {
        (**self).on_graph(graph)
    }

    fn on_round(&mut self, round: usize, chosen: &NodeId, graph: &BoardGraph) {
        (**self).on_round(round, chosen, graph)
    }

    fn on_cleared(&mut self, rounds: usize) {
        (**self).on_cleared(rounds)
    }
}
