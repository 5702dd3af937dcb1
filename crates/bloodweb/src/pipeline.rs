//! End-to-end helpers: captures in, board graph and claim order out.

use bloodweb_core::{BoardError, BoardGraph, BoardImage, BoardObserver};
use bloodweb_detect::{Detector, TemplateAtlas};
use bloodweb_select::{Round, Selector, SelectorParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Detect one board from a set of captures of the same screen.
///
/// Order: origin, prestige check, nodes, connections, graph validation. The
/// observer sees the raw detections and the built graph.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(views = views.len()))
)]
pub fn detect_board<O: BoardObserver + ?Sized>(
    detector: &Detector,
    atlas: &TemplateAtlas,
    views: &[BoardImage],
    observer: &mut O,
) -> Result<BoardGraph, BoardError> {
    let origin = detector.locate_origin(views)?;
    detector.check_origin(views, &origin, atlas)?;
    let nodes = detector.detect_nodes(views, &origin, atlas)?;

    let mut all = Vec::with_capacity(nodes.len() + 1);
    all.push(origin.clone());
    all.extend(nodes.iter().cloned());
    let connections = detector.detect_connections(views, &all);
    observer.on_detections(&origin, &nodes, &connections);

    let graph = BoardGraph::build(origin, nodes, &connections)?;
    log::info!(
        "board: {} node(s), {} connection(s), {} claimable",
        graph.len(),
        graph.connections().len(),
        graph.claimable().count()
    );
    observer.on_graph(&graph);
    Ok(graph)
}

/// Claim order for a detected board, without any input in between.
///
/// Drives `graph` to exhaustion; every round is reported to the observer.
pub fn plan_claims<O: BoardObserver + ?Sized>(
    graph: &mut BoardGraph,
    params: SelectorParams,
    observer: &mut O,
) -> Vec<Round> {
    let mut selector = Selector::new(params);
    let mut rounds = Vec::new();
    while let Some(round) = selector.next_round(graph) {
        observer.on_round(round.index, &round.node, graph);
        rounds.push(round);
    }
    observer.on_cleared(rounds.len());
    rounds
}
