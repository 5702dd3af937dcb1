use bloodweb_core::{BoardGraph, NodeId};
use serde::{Deserialize, Serialize};

use crate::{rank_candidates, SelectorParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorState {
    Active,
    /// Terminal: nothing accessible and unclaimed remains.
    Exhausted,
}

/// One completed selection round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based.
    pub index: usize,
    pub node: NodeId,
}

/// Accessible, unclaimed, non-origin nodes left on the board.
pub fn remaining_count(graph: &BoardGraph) -> usize {
    graph.claimable().count()
}

/// Selection state for one board graph.
///
/// Use a fresh selector for every freshly captured graph.
#[derive(Clone, Debug)]
pub struct Selector {
    params: SelectorParams,
    state: SelectorState,
    anchor: Option<NodeId>,
    rounds: usize,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new(SelectorParams::default())
    }
}

impl Selector {
    pub fn new(params: SelectorParams) -> Self {
        Self {
            params,
            state: SelectorState::Active,
            anchor: None,
            rounds: 0,
        }
    }

    #[inline]
    pub fn params(&self) -> &SelectorParams {
        &self.params
    }

    #[inline]
    pub fn state(&self) -> SelectorState {
        self.state
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.state == SelectorState::Exhausted
    }

    /// Last claimed node; `None` before the first claim.
    pub fn anchor(&self) -> Option<&NodeId> {
        self.anchor.as_ref()
    }

    /// Claims applied so far.
    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Best claimable node, or `None` once the board is exhausted.
    ///
    /// An empty candidate set is final: later calls return `None` without
    /// looking at the graph again.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, graph), fields(nodes = graph.len()))
    )]
    pub fn select_next(&mut self, graph: &BoardGraph) -> Option<NodeId> {
        if self.is_exhausted() {
            return None;
        }
        let ranked = rank_candidates(graph, self.anchor.as_ref(), &self.params);
        match ranked.into_iter().next() {
            Some(best) => {
                log::debug!(
                    "next {} (desirability {}, {} hop(s) from anchor, aiming at {})",
                    best.id,
                    best.desirability,
                    best.anchor_hops,
                    best.target
                );
                Some(best.id)
            }
            None => {
                log::info!("board exhausted after {} claim(s)", self.rounds);
                self.state = SelectorState::Exhausted;
                None
            }
        }
    }

    /// Claim `id` and unlock its unclaimed neighbors.
    ///
    /// Returns `false`, changing nothing, for unknown ids, the origin, or an
    /// already claimed node.
    pub fn apply_claim(&mut self, graph: &mut BoardGraph, id: &NodeId) -> bool {
        if !graph.mark_claimed(id) {
            return false;
        }
        let neighbors: Vec<NodeId> = graph.neighbors(id).into_iter().cloned().collect();
        let mut unlocked = 0;
        for n in &neighbors {
            let open = graph.node(n).is_some_and(|node| !node.is_claimed());
            if open && graph.mark_accessible(n) {
                unlocked += 1;
            }
        }
        log::debug!("claimed {id}, unlocked {unlocked} neighbor(s)");
        self.anchor = Some(id.clone());
        self.rounds += 1;
        true
    }

    /// Select and claim in one step, without any input in between.
    pub fn next_round(&mut self, graph: &mut BoardGraph) -> Option<Round> {
        let node = self.select_next(graph)?;
        self.apply_claim(graph, &node);
        Some(Round {
            index: self.rounds,
            node,
        })
    }

    /// Claim order for the whole board, driving `graph` to exhaustion.
    pub fn run_to_exhaustion(&mut self, graph: &mut BoardGraph) -> Vec<Round> {
        std::iter::from_fn(|| self.next_round(graph)).collect()
    }
}
