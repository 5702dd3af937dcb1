use serde::{Deserialize, Serialize};

/// Weights of the desirability score.
///
/// ```text
/// desirability(c) = max over t reachable from c through unclaimed nodes of
///                       value(t) - lookahead_hop_penalty * hops(c, t)
///                   - anchor_hop_penalty * hops(anchor, c)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorParams {
    /// Cost per hop between a candidate and a value it unlocks.
    pub lookahead_hop_penalty: i64,
    /// Cost per hop between the last claim and a candidate.
    pub anchor_hop_penalty: i64,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            lookahead_hop_penalty: 50,
            anchor_hop_penalty: 10,
        }
    }
}

impl SelectorParams {
    /// Pure value greed: only the candidate's own value counts.
    pub fn greedy() -> Self {
        Self {
            lookahead_hop_penalty: i64::from(i32::MAX),
            anchor_hop_penalty: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let p: SelectorParams = serde_json::from_str(r#"{ "anchor_hop_penalty": 0 }"#).unwrap();
        assert_eq!(p.lookahead_hop_penalty, 50);
        assert_eq!(p.anchor_hop_penalty, 0);
    }
}
