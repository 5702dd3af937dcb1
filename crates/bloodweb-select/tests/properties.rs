use std::collections::HashSet;

use bloodweb_core::{BoardGraph, Connection, NodeBuilder, NodeId, NodeState, CLAIMED_VALUE};
use bloodweb_select::{remaining_count, Selector, SelectorParams};
use nalgebra::Point2;

/// Small deterministic generator so the boards are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn id(slot: u32) -> NodeId {
    if slot == 0 {
        NodeId::origin()
    } else {
        NodeId::new(slot, format!("n{slot}"))
    }
}

fn random_board(seed: u64) -> BoardGraph {
    let mut rng = Lcg(seed);
    let n = 5 + rng.below(25) as u32;
    let origin = NodeBuilder::origin(Point2::new(0.0, 0.0)).build().unwrap();

    let nodes = (1..=n)
        .map(|slot| {
            let state = match rng.below(6) {
                0 => NodeState::Claimed,
                1 | 2 => NodeState::Unlocked,
                _ => NodeState::Locked,
            };
            NodeBuilder::new(slot, Point2::new(slot as f32, 0.0))
                .suffix(format!("n{slot}"))
                .state(state)
                .value(rng.below(1000) as i32)
                .build()
                .unwrap()
        })
        .collect();

    let mut conns = Vec::new();
    // A spanning tree keeps most of the board connected; extra edges add cycles.
    for slot in 1..=n {
        let parent = rng.below(slot as u64) as u32;
        conns.push(Connection::new(id(parent), id(slot)).unwrap());
    }
    for _ in 0..n / 2 {
        let a = rng.below(n as u64 + 1) as u32;
        let b = rng.below(n as u64 + 1) as u32;
        if let Some(c) = Connection::new(id(a), id(b)) {
            conns.push(c);
        }
    }
    BoardGraph::build(origin, nodes, &conns).unwrap()
}

#[test]
fn rounds_only_pick_claimable_nodes_and_never_undo_claims() {
    for seed in 0..40 {
        for params in [SelectorParams::default(), SelectorParams::greedy()] {
            let mut graph = random_board(seed);
            let origin = graph.origin().id().clone();
            let mut selector = Selector::new(params);
            let mut claimed: HashSet<NodeId> = graph
                .nodes()
                .filter(|n| n.is_claimed())
                .map(|n| n.id().clone())
                .collect();

            while let Some(next) = selector.select_next(&graph) {
                let node = graph.node(&next).unwrap();
                assert!(node.is_accessible(), "seed {seed}: {next} not accessible");
                assert!(!node.is_claimed(), "seed {seed}: {next} already claimed");
                assert_ne!(next, origin);

                assert!(selector.apply_claim(&mut graph, &next));
                claimed.insert(next);

                for id in &claimed {
                    let n = graph.node(id).unwrap();
                    assert!(n.is_claimed());
                    assert_eq!(n.value(), CLAIMED_VALUE);
                }
            }

            assert_eq!(remaining_count(&graph), 0);
            assert!(graph.origin().is_accessible());
            for _ in 0..3 {
                assert_eq!(selector.select_next(&graph), None);
            }
        }
    }
}

#[test]
fn same_board_gives_same_order() {
    for seed in 0..10 {
        let mut a = random_board(seed);
        let mut b = random_board(seed);
        let ra = Selector::default().run_to_exhaustion(&mut a);
        let rb = Selector::default().run_to_exhaustion(&mut b);
        assert_eq!(ra, rb);
    }
}
