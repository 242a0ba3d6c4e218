//! Error types and error classification for volley.

use thiserror::Error;

/// Coarse classification of a [`VolleyError`], used by reports to group
/// failures without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed machine or template (bad sums, dangling targets, unknown states).
    Structural,
    /// A terminal state outside both win partitions.
    UnrecognizedTerminal,
    /// A symbolic statistic that resolves to no transition, or to one that
    /// cannot be moved.
    TargetNotFound,
    /// Elasticity against a zero baseline win rate.
    DivisionByZero,
    /// Bad caller input (empty templates, zero improvement, I/O, parsing).
    Input,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structural => write!(f, "structural"),
            Self::UnrecognizedTerminal => write!(f, "unrecognized_terminal"),
            Self::TargetNotFound => write!(f, "target_not_found"),
            Self::DivisionByZero => write!(f, "division_by_zero"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Volley errors.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// Lookup of a state that is neither a continuation nor a terminal state.
    #[error("unknown state '{state}'")]
    UnknownState { state: String },

    /// Outgoing probabilities of a state do not sum to 1 within tolerance.
    #[error("probabilities for state '{state}' sum to {sum:.6}, expected 1.0 (tolerance {tolerance})")]
    InvalidDistribution {
        state: String,
        sum: f64,
        tolerance: f64,
    },

    /// A transition points at a state the machine does not define.
    #[error("transition '{from}' -> '{to}' targets an undefined state")]
    DanglingTransition { from: String, to: String },

    /// A continuation state with no outgoing transitions.
    #[error("continuation state '{state}' has no outgoing transitions")]
    EmptyTransitions { state: String },

    /// The initial state is terminal.
    #[error("initial state '{state}' is terminal")]
    InitialStateTerminal { state: String },

    /// The initial state has no transition row.
    #[error("initial state '{state}' is not a continuation state")]
    InitialStateMissing { state: String },

    /// A state is listed both as terminal and as having transitions.
    #[error("terminal state '{state}' has outgoing transitions")]
    TerminalHasTransitions { state: String },

    /// A continuation state whose name carries no side prefix.
    #[error("state '{state}' has no acting side (expected prefix 's_' or 'r_')")]
    UnknownSide { state: String },

    /// A terminal state in neither win partition.
    #[error("terminal state '{state}' is not assigned to either side")]
    UnrecognizedTerminal { state: String },

    /// A team template with no rows.
    #[error("template for team {team} is empty")]
    EmptyTemplate { team: String },

    /// A symbolic statistic that does not resolve to a transition.
    #[error("no transition matches statistic '{statistic}'")]
    TargetNotFound { statistic: String },

    /// The targeted probability cannot change under the requested
    /// improvement (zero, or pinned at 1 with no sibling mass).
    #[error("statistic '{statistic}' cannot be perturbed from {value}")]
    TargetImmovable { statistic: String, value: f64 },

    /// Elasticity is undefined because the baseline win rate is zero.
    #[error("elasticity for '{statistic}' is undefined: baseline win rate is 0")]
    DivisionByZero { statistic: String },

    /// Improvement factor is zero or not finite.
    #[error("improvement must be finite, non-zero and greater than -1, got {delta}")]
    InvalidImprovement { delta: f64 },

    /// Every simulated point exceeded the step budget.
    #[error("none of {points} simulated points reached a terminal state")]
    NoDecidedPoints { points: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while reading templates.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VolleyError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownState { .. }
            | Self::InvalidDistribution { .. }
            | Self::DanglingTransition { .. }
            | Self::EmptyTransitions { .. }
            | Self::InitialStateTerminal { .. }
            | Self::InitialStateMissing { .. }
            | Self::TerminalHasTransitions { .. }
            | Self::UnknownSide { .. } => ErrorKind::Structural,
            Self::UnrecognizedTerminal { .. } => ErrorKind::UnrecognizedTerminal,
            Self::TargetNotFound { .. } | Self::TargetImmovable { .. } => {
                ErrorKind::TargetNotFound
            }
            Self::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            Self::EmptyTemplate { .. }
            | Self::InvalidImprovement { .. }
            | Self::NoDecidedPoints { .. }
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Input,
        }
    }
}

/// Result type alias for volley operations.
pub type VolleyResult<T> = Result<T, VolleyError>;
