//! Immutable rally state machine.
//!
//! A machine owns its transition table. Rows are stored behind `Arc` so a
//! derived machine (see [`StateMachine::with_row`]) shares every untouched
//! row with the machine it came from.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{VolleyError, VolleyResult};
use crate::state::{Side, Transition};

/// Allowed deviation of a row's probability sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 0.001;

/// Initial state of every rally.
pub const DEFAULT_INITIAL_STATE: &str = "s_serve_ready";

/// Outgoing transitions of one state.
pub type Row = Arc<[Transition]>;

/// Directed weighted graph of rally states.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMachine {
    transitions: BTreeMap<String, Row>,
    terminal: Arc<BTreeSet<String>>,
    sides: Arc<BTreeMap<String, Side>>,
    initial: String,
}

impl StateMachine {
    /// Build a machine, checking every structural invariant.
    ///
    /// Fails on dangling destinations, empty rows, a terminal or missing
    /// initial state, overlap between terminal and continuation states,
    /// continuation states without a side prefix, and rows whose
    /// probabilities do not sum to 1.
    pub fn new(
        transitions: BTreeMap<String, Vec<Transition>>,
        terminal: BTreeSet<String>,
        initial: impl Into<String>,
    ) -> VolleyResult<Self> {
        let transitions = transitions
            .into_iter()
            .map(|(state, row)| (state, Row::from(row)))
            .collect();
        Self::from_rows(transitions, Arc::new(terminal), initial.into())
    }

    fn from_rows(
        transitions: BTreeMap<String, Row>,
        terminal: Arc<BTreeSet<String>>,
        initial: String,
    ) -> VolleyResult<Self> {
        let mut sides = BTreeMap::new();
        for state in terminal.iter() {
            if transitions.contains_key(state) {
                return Err(VolleyError::TerminalHasTransitions {
                    state: state.clone(),
                });
            }
            sides.insert(state.clone(), Side::Terminal);
        }
        for (state, row) in &transitions {
            let side = Side::from_prefix(state).ok_or_else(|| VolleyError::UnknownSide {
                state: state.clone(),
            })?;
            if row.is_empty() {
                return Err(VolleyError::EmptyTransitions {
                    state: state.clone(),
                });
            }
            sides.insert(state.clone(), side);
        }

        if terminal.contains(&initial) {
            return Err(VolleyError::InitialStateTerminal { state: initial });
        }
        if !transitions.contains_key(&initial) {
            return Err(VolleyError::InitialStateMissing { state: initial });
        }

        let machine = Self {
            transitions,
            terminal,
            sides: Arc::new(sides),
            initial,
        };
        machine.check_destinations()?;
        machine.validate()?;
        Ok(machine)
    }

    fn check_destinations(&self) -> VolleyResult<()> {
        for (from, row) in &self.transitions {
            if let Some(t) = row.iter().find(|t| !self.sides.contains_key(&t.to)) {
                return Err(VolleyError::DanglingTransition {
                    from: from.clone(),
                    to: t.to.clone(),
                });
            }
        }
        Ok(())
    }

    /// Initial state.
    pub fn initial_state(&self) -> &str {
        &self.initial
    }

    /// Terminal states.
    pub fn terminal_states(&self) -> &BTreeSet<String> {
        &self.terminal
    }

    /// Iterate over continuation rows in state order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Transition])> {
        self.transitions
            .iter()
            .map(|(state, row)| (state.as_str(), &row[..]))
    }

    /// Shared handle to a row, for identity checks and cheap cloning.
    pub fn row(&self, state: &str) -> Option<&Row> {
        self.transitions.get(state)
    }

    /// Ordered transitions of a continuation state.
    ///
    /// Terminal states yield an empty slice; unknown states fail.
    pub fn transitions_from(&self, state: &str) -> VolleyResult<&[Transition]> {
        match self.transitions.get(state) {
            Some(row) => Ok(&row[..]),
            None if self.is_terminal(state) => Ok(&[]),
            None => Err(VolleyError::UnknownState {
                state: state.to_string(),
            }),
        }
    }

    /// Check if a state ends the rally.
    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminal.contains(state)
    }

    /// Check if `to` is a one-step destination of `from`.
    pub fn is_valid_transition(&self, from: &str, to: &str) -> bool {
        self.transitions
            .get(from)
            .is_some_and(|row| row.iter().any(|t| t.to == to))
    }

    /// Side acting in a state, resolved when the machine was built.
    pub fn acting_side(&self, state: &str) -> VolleyResult<Side> {
        self.sides
            .get(state)
            .copied()
            .ok_or_else(|| VolleyError::UnknownState {
                state: state.to_string(),
            })
    }

    /// Every state, continuation and terminal.
    pub fn all_states(&self) -> BTreeSet<&str> {
        self.sides.keys().map(String::as_str).collect()
    }

    /// States with outgoing transitions.
    pub fn continuation_states(&self) -> BTreeSet<&str> {
        self.transitions.keys().map(String::as_str).collect()
    }

    /// Check that every row sums to 1 within [`PROBABILITY_TOLERANCE`].
    ///
    /// Reports the first offending state; never repairs.
    pub fn validate(&self) -> VolleyResult<()> {
        for (state, row) in &self.transitions {
            check_distribution(state, row.iter().map(|t| t.probability))?;
        }
        Ok(())
    }

    /// Derive a machine that differs from this one in a single row.
    ///
    /// All other rows are shared with `self`. The replacement must keep the
    /// machine well-formed.
    pub fn with_row(&self, state: &str, row: Vec<Transition>) -> VolleyResult<StateMachine> {
        if !self.transitions.contains_key(state) {
            return Err(VolleyError::UnknownState {
                state: state.to_string(),
            });
        }
        let mut transitions = self.transitions.clone();
        transitions.insert(state.to_string(), Row::from(row));
        Self::from_rows(transitions, Arc::clone(&self.terminal), self.initial.clone())
    }
}

/// Check one row's probabilities against [`PROBABILITY_TOLERANCE`].
pub fn check_distribution(
    state: &str,
    probabilities: impl IntoIterator<Item = f64>,
) -> VolleyResult<()> {
    let mut sum = 0.0;
    let mut negative = false;
    for p in probabilities {
        negative |= p < 0.0;
        sum += p;
    }
    if negative || !sum.is_finite() || (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(VolleyError::InvalidDistribution {
            state: state.to_string(),
            sum,
            tolerance: PROBABILITY_TOLERANCE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActionKind;

    fn row(edges: &[(&str, f64)]) -> Vec<Transition> {
        edges
            .iter()
            .map(|(to, p)| Transition::new(*to, *p, ActionKind::Serve))
            .collect()
    }

    fn terminals(states: &[&str]) -> BTreeSet<String> {
        states.iter().map(|s| s.to_string()).collect()
    }

    fn tiny() -> StateMachine {
        let mut transitions = BTreeMap::new();
        transitions.insert(
            "s_serve_ready".to_string(),
            row(&[("s_serve_ace", 0.3), ("r_pass", 0.7)]),
        );
        transitions.insert(
            "r_pass".to_string(),
            row(&[("r_kill", 0.5), ("r_error", 0.5)]),
        );
        StateMachine::new(
            transitions,
            terminals(&["s_serve_ace", "r_kill", "r_error"]),
            DEFAULT_INITIAL_STATE,
        )
        .unwrap()
    }

    #[test]
    fn lookups() {
        let sm = tiny();
        assert_eq!(sm.initial_state(), "s_serve_ready");
        assert_eq!(sm.transitions_from("s_serve_ready").unwrap().len(), 2);
        assert!(sm.transitions_from("r_kill").unwrap().is_empty());
        assert!(matches!(
            sm.transitions_from("r_nowhere"),
            Err(VolleyError::UnknownState { .. })
        ));
    }

    #[test]
    fn valid_transitions() {
        let sm = tiny();
        assert!(sm.is_valid_transition("s_serve_ready", "r_pass"));
        assert!(sm.is_valid_transition("r_pass", "r_kill"));
        assert!(!sm.is_valid_transition("s_serve_ready", "r_kill"));
        assert!(!sm.is_valid_transition("r_kill", "r_pass"));
        assert!(!sm.is_valid_transition("r_nowhere", "r_pass"));
    }

    #[test]
    fn sides_and_partitions() {
        let sm = tiny();
        assert_eq!(sm.acting_side("s_serve_ready").unwrap(), Side::Serving);
        assert_eq!(sm.acting_side("r_pass").unwrap(), Side::Receiving);
        assert_eq!(sm.acting_side("r_kill").unwrap(), Side::Terminal);
        assert_eq!(sm.all_states().len(), 5);
        assert_eq!(
            sm.continuation_states().into_iter().collect::<Vec<_>>(),
            vec!["r_pass", "s_serve_ready"]
        );
    }

    #[test]
    fn rejects_bad_sum() {
        let mut transitions = BTreeMap::new();
        transitions.insert(
            "s_serve_ready".to_string(),
            row(&[("s_serve_ace", 0.3), ("s_serve_error", 0.6)]),
        );
        let err = StateMachine::new(
            transitions,
            terminals(&["s_serve_ace", "s_serve_error"]),
            DEFAULT_INITIAL_STATE,
        )
        .unwrap_err();
        match err {
            VolleyError::InvalidDistribution { state, sum, .. } => {
                assert_eq!(state, "s_serve_ready");
                assert!((sum - 0.9).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_dangling_destination() {
        let mut transitions = BTreeMap::new();
        transitions.insert(
            "s_serve_ready".to_string(),
            row(&[("s_serve_ace", 0.5), ("r_ghost", 0.5)]),
        );
        let err = StateMachine::new(transitions, terminals(&["s_serve_ace"]), DEFAULT_INITIAL_STATE)
            .unwrap_err();
        assert!(matches!(err, VolleyError::DanglingTransition { to, .. } if to == "r_ghost"));
    }

    #[test]
    fn rejects_terminal_initial_state() {
        let mut transitions = BTreeMap::new();
        transitions.insert("r_pass".to_string(), row(&[("r_kill", 1.0)]));
        let err = StateMachine::new(transitions, terminals(&["r_kill"]), "r_kill").unwrap_err();
        assert!(matches!(err, VolleyError::InitialStateTerminal { .. }));
    }

    #[test]
    fn rejects_unprefixed_continuation() {
        let mut transitions = BTreeMap::new();
        transitions.insert("s_serve_ready".to_string(), row(&[("timeout", 1.0)]));
        transitions.insert("timeout".to_string(), row(&[("s_serve_ace", 1.0)]));
        let err = StateMachine::new(transitions, terminals(&["s_serve_ace"]), DEFAULT_INITIAL_STATE)
            .unwrap_err();
        assert!(matches!(err, VolleyError::UnknownSide { state } if state == "timeout"));
    }

    #[test]
    fn with_row_shares_untouched_rows() {
        let sm = tiny();
        let derived = sm
            .with_row("s_serve_ready", row(&[("s_serve_ace", 0.4), ("r_pass", 0.6)]))
            .unwrap();

        assert!(Arc::ptr_eq(sm.row("r_pass").unwrap(), derived.row("r_pass").unwrap()));
        assert!(!Arc::ptr_eq(
            sm.row("s_serve_ready").unwrap(),
            derived.row("s_serve_ready").unwrap()
        ));
        assert_eq!(sm.transitions_from("s_serve_ready").unwrap()[0].probability, 0.3);
        assert_ne!(sm, derived);
    }

    #[test]
    fn with_row_rejects_invalid_replacement() {
        let sm = tiny();
        let err = sm
            .with_row("s_serve_ready", row(&[("s_serve_ace", 0.4)]))
            .unwrap_err();
        assert!(matches!(err, VolleyError::InvalidDistribution { .. }));
    }
}
