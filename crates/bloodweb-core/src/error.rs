use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage that failed to reach consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStage {
    Capture,
    Origin,
    Nodes,
    Connections,
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionStage::Capture => "capture",
            DetectionStage::Origin => "origin",
            DetectionStage::Nodes => "node",
            DetectionStage::Connections => "connection",
        };
        f.write_str(s)
    }
}

/// Errors that end a capture cycle.
///
/// Low-confidence icon matches are not errors: they leave the node's
/// identity unresolved (see [`crate::Identity::Unresolved`]).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    /// Quorum not reached; re-capture and retry.
    #[error("inconclusive {stage} detection: {detail}")]
    InconclusiveDetection {
        stage: DetectionStage,
        detail: String,
    },
    /// Structural inconsistency; the board must be re-captured from scratch.
    #[error("malformed board graph: {0}")]
    MalformedGraph(String),
    /// The screen is not a regular bloodweb (prestige, reset, ...).
    #[error("unexpected board state: {0}")]
    UnexpectedBoardState(String),
}

impl BoardError {
    pub fn inconclusive(stage: DetectionStage, detail: impl Into<String>) -> Self {
        BoardError::InconclusiveDetection {
            stage,
            detail: detail.into(),
        }
    }

    /// Whether a fresh capture may fix the problem.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BoardError::UnexpectedBoardState(_))
    }
}
