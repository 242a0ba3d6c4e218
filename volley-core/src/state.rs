//! State vocabulary for rally machines.
//!
//! States are plain string identifiers. The only structure read from a name
//! is its side prefix (`s_` for the serving side, `r_` for the receiving
//! side), and that is resolved once when a machine is built.

use serde::{Deserialize, Serialize};

/// Prefix of states where the serving side acts.
pub const SERVING_PREFIX: &str = "s_";
/// Prefix of states where the receiving side acts.
pub const RECEIVING_PREFIX: &str = "r_";

/// Which side a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The side that served this rally.
    Serving,
    /// The side that received the serve.
    Receiving,
    /// Rally-ending state.
    Terminal,
}

impl Side {
    /// Side encoded in a state name's prefix, if any.
    pub fn from_prefix(state: &str) -> Option<Side> {
        if state.starts_with(SERVING_PREFIX) {
            Some(Side::Serving)
        } else if state.starts_with(RECEIVING_PREFIX) {
            Some(Side::Receiving)
        } else {
            None
        }
    }

    /// The opposing side. Terminal has no opponent.
    pub fn opponent(&self) -> Side {
        match self {
            Self::Serving => Self::Receiving,
            Self::Receiving => Self::Serving,
            Self::Terminal => Self::Terminal,
        }
    }

    /// Check if this is the terminal marker.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serving => write!(f, "serving"),
            Self::Receiving => write!(f, "receiving"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

/// Skill label attached to a transition. Labels only; simulation never
/// branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Serve,
    Reception,
    Set,
    Attack,
    Dig,
    Block,
    /// Neutral pass-through.
    Transition,
}

impl ActionKind {
    /// Keyword order used by [`ActionKind::infer`]. First match wins.
    const KEYWORDS: [(&'static str, ActionKind); 7] = [
        ("serve", ActionKind::Serve),
        ("reception", ActionKind::Reception),
        ("set", ActionKind::Set),
        ("attack", ActionKind::Attack),
        ("dig", ActionKind::Dig),
        ("block", ActionKind::Block),
        ("transition", ActionKind::Transition),
    ];

    /// Infer an action kind from a state name by keyword, falling back to
    /// [`ActionKind::Transition`].
    pub fn infer(state: &str) -> ActionKind {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| state.contains(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(ActionKind::Transition)
    }
}

/// One outgoing edge of a continuation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Destination state.
    pub to: String,
    /// Probability of taking this edge.
    pub probability: f64,
    /// Skill label.
    pub action: ActionKind,
}

impl Transition {
    /// Create a transition.
    pub fn new(to: impl Into<String>, probability: f64, action: ActionKind) -> Self {
        Self {
            to: to.into(),
            probability,
            action,
        }
    }

    /// Same edge with a different probability.
    pub fn with_probability(&self, probability: f64) -> Self {
        Self {
            probability,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_prefix() {
        assert_eq!(Side::from_prefix("s_serve_ready"), Some(Side::Serving));
        assert_eq!(Side::from_prefix("r_set_good"), Some(Side::Receiving));
        assert_eq!(Side::from_prefix("timeout"), None);
    }

    #[test]
    fn side_opponent() {
        assert_eq!(Side::Serving.opponent(), Side::Receiving);
        assert_eq!(Side::Receiving.opponent(), Side::Serving);
        assert!(Side::Terminal.opponent().is_terminal());
    }

    #[test]
    fn action_inference() {
        assert_eq!(ActionKind::infer("s_serve_in_play"), ActionKind::Serve);
        assert_eq!(ActionKind::infer("r_reception_good"), ActionKind::Reception);
        assert_eq!(ActionKind::infer("r_set_perfect"), ActionKind::Set);
        assert_eq!(ActionKind::infer("s_attack_blocked"), ActionKind::Attack);
        assert_eq!(ActionKind::infer("r_dig_good"), ActionKind::Dig);
        assert_eq!(ActionKind::infer("s_block_kill"), ActionKind::Block);
        assert_eq!(ActionKind::infer("r_free_ball"), ActionKind::Transition);
    }

    #[test]
    fn action_kind_serde() {
        let json = serde_json::to_string(&ActionKind::Reception).unwrap();
        assert_eq!(json, "\"reception\"");
    }
}
