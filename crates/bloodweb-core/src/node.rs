//! Board positions and their claim state.

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Reserved value for nodes claimed during this session.
pub const CLAIMED_VALUE: i32 = 9999;

/// Identity of the mystery box unlockable (needs an extra click after claiming).
pub const MYSTERY_BOX: &str = "iconHelp_mysteryBox";

const RED_HEX: &str = "#b3202a";
const TAUPE_HEX: &str = "#8b7d6b";
const NEUTRAL_HEX: &str = "#3c3c3c";

/// Board slot index plus a unique suffix.
///
/// Ordering is by slot first; that order is the deterministic tie-break
/// used by the selector.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub slot: u32,
    pub suffix: String,
}

impl NodeId {
    pub fn new(slot: u32, suffix: impl Into<String>) -> Self {
        Self {
            slot,
            suffix: suffix.into(),
        }
    }

    /// Id of the board origin.
    pub fn origin() -> Self {
        Self::new(0, "origin")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.slot, self.suffix)
    }
}

/// Icon identity of a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// No atlas template cleared the confidence threshold.
    #[default]
    Unresolved,
    Resolved(String),
}

impl Identity {
    /// Resolved identity; a trailing `.png` from template file names is dropped.
    pub fn resolved(name: &str) -> Self {
        Identity::Resolved(name.strip_suffix(".png").unwrap_or(name).to_string())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Identity::Unresolved => None,
            Identity::Resolved(name) => Some(name),
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Identity::Resolved(_))
    }
}

/// Capture-time state implied by a node's color band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Neutral band: not selectable yet.
    Locked,
    /// Taupe band: selectable.
    Unlocked,
    /// Red band: already claimed.
    Claimed,
}

impl NodeState {
    /// `(accessible, claimed)` implied by this state.
    pub fn flags(self) -> (bool, bool) {
        match self {
            NodeState::Locked => (false, false),
            NodeState::Unlocked => (true, false),
            NodeState::Claimed => (true, true),
        }
    }

    pub fn from_flags(accessible: bool, claimed: bool) -> Self {
        match (accessible, claimed) {
            (_, true) => NodeState::Claimed,
            (true, false) => NodeState::Unlocked,
            (false, false) => NodeState::Locked,
        }
    }

    pub fn status_color(self) -> &'static str {
        match self {
            NodeState::Locked => NEUTRAL_HEX,
            NodeState::Unlocked => TAUPE_HEX,
            NodeState::Claimed => RED_HEX,
        }
    }
}

/// One board position.
///
/// Built with [`NodeBuilder`] only; [`NodeRecord`] is the form that is read
/// back from JSON. Only `value`, `accessible` and `claimed` change after
/// construction, and only through [`crate::BoardGraph`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    id: NodeId,
    identity: Identity,
    value: i32,
    position: Point2<f32>,
    radius: f32,
    accessible: bool,
    claimed: bool,
    origin: bool,
}

impl Node {
    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[inline]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    #[inline]
    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    #[inline]
    pub fn is_origin(&self) -> bool {
        self.origin
    }

    #[inline]
    pub fn state(&self) -> NodeState {
        NodeState::from_flags(self.accessible, self.claimed)
    }

    /// Accessible, unclaimed, and not the origin.
    #[inline]
    pub fn is_claimable(&self) -> bool {
        self.accessible && !self.claimed && !self.origin
    }

    pub fn is_mystery_box(&self) -> bool {
        self.identity.name() == Some(MYSTERY_BOX)
    }

    /// Claim the node; returns `false` if nothing changed.
    pub(crate) fn claim(&mut self) -> bool {
        if self.claimed || self.origin {
            return false;
        }
        self.claimed = true;
        self.accessible = true;
        self.value = CLAIMED_VALUE;
        true
    }

    pub(crate) fn unlock(&mut self) -> bool {
        if self.accessible {
            return false;
        }
        self.accessible = true;
        true
    }

    /// External id-keyed representation.
    pub fn record(&self) -> NodeRecord {
        let state = self.state();
        let claim_text = if self.claimed {
            "user claimed"
        } else {
            "not claimed"
        };
        NodeRecord {
            id: self.id.to_string(),
            identity: self.identity.name().map(str::to_string),
            value: self.value,
            x: self.position.x.round() as i32,
            y: self.position.y.round() as i32,
            accessible: self.accessible,
            claimed: self.claimed,
            origin: self.origin,
            label: format!("{}, {}", self.value, claim_text),
            color: state.status_color().to_string(),
        }
    }
}

/// Serializable node snapshot for graph-inspection tooling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub identity: Option<String>,
    pub value: i32,
    pub x: i32,
    pub y: i32,
    pub accessible: bool,
    pub claimed: bool,
    pub origin: bool,
    pub label: String,
    pub color: String,
}

/// Node construction errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NodeBuildError {
    #[error("position must be finite, got ({x}, {y})")]
    NonFinitePosition { x: f32, y: f32 },
    #[error("radius must be finite and >= 0, got {0}")]
    InvalidRadius(f32),
    #[error("origin must be accessible and unclaimed, got {0:?}")]
    OriginState(NodeState),
    #[error("suffix must not be empty")]
    EmptySuffix,
}

/// Builder for [`Node`]: required slot and position, named overrides for the rest.
#[derive(Clone, Debug)]
pub struct NodeBuilder {
    slot: u32,
    position: Point2<f32>,
    suffix: Option<String>,
    identity: Identity,
    value: Option<i32>,
    radius: f32,
    state: Option<NodeState>,
    origin: bool,
}

impl NodeBuilder {
    pub fn new(slot: u32, position: Point2<f32>) -> Self {
        Self {
            slot,
            position,
            suffix: None,
            identity: Identity::Unresolved,
            value: None,
            radius: 0.0,
            state: None,
            origin: false,
        }
    }

    /// Builder for the board origin (slot 0, accessible, unclaimed).
    pub fn origin(position: Point2<f32>) -> Self {
        let mut b = Self::new(0, position);
        b.origin = true;
        b
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn state(mut self, state: NodeState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<Node, NodeBuildError> {
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(NodeBuildError::NonFinitePosition {
                x: self.position.x,
                y: self.position.y,
            });
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(NodeBuildError::InvalidRadius(self.radius));
        }

        let state = match (self.origin, self.state) {
            (true, Some(s)) if s != NodeState::Unlocked => {
                return Err(NodeBuildError::OriginState(s))
            }
            (true, _) => NodeState::Unlocked,
            (false, s) => s.unwrap_or(NodeState::Locked),
        };

        let suffix = match self.suffix {
            Some(s) if s.is_empty() => return Err(NodeBuildError::EmptySuffix),
            Some(s) => s,
            None if self.origin => "origin".to_string(),
            None => self.identity.name().unwrap_or("unknown").to_string(),
        };

        // A node captured in the red band is already ours this session.
        let value = if state == NodeState::Claimed {
            CLAIMED_VALUE
        } else {
            self.value.unwrap_or(0)
        };

        let (accessible, claimed) = state.flags();
        Ok(Node {
            id: NodeId::new(self.slot, suffix),
            identity: self.identity,
            value,
            position: self.position,
            radius: self.radius,
            accessible,
            claimed,
            origin: self.origin,
        })
    }
}
