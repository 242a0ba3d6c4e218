//! Mapping from terminal states to the side that wins the point.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{VolleyError, VolleyResult};
use crate::machine::StateMachine;
use crate::state::Side;

/// Partition of terminal states into serving-side and receiving-side wins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WinnerAssignment {
    serving: BTreeSet<String>,
    receiving: BTreeSet<String>,
}

impl WinnerAssignment {
    /// Create an assignment from the two win sets.
    pub fn new<S, R>(serving: S, receiving: R) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            serving: serving.into_iter().map(Into::into).collect(),
            receiving: receiving.into_iter().map(Into::into).collect(),
        }
    }

    /// Terminal states that award the point to the serving side.
    pub fn serving_wins(&self) -> &BTreeSet<String> {
        &self.serving
    }

    /// Terminal states that award the point to the receiving side.
    pub fn receiving_wins(&self) -> &BTreeSet<String> {
        &self.receiving
    }

    /// Side awarded the point by a terminal state.
    pub fn winner(&self, terminal: &str) -> VolleyResult<Side> {
        if self.serving.contains(terminal) {
            Ok(Side::Serving)
        } else if self.receiving.contains(terminal) {
            Ok(Side::Receiving)
        } else {
            Err(VolleyError::UnrecognizedTerminal {
                state: terminal.to_string(),
            })
        }
    }

    /// Check that every terminal state of `machine` is assigned.
    pub fn covers(&self, machine: &StateMachine) -> VolleyResult<()> {
        machine
            .terminal_states()
            .iter()
            .try_for_each(|state| self.winner(state).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_lookup() {
        let winners = WinnerAssignment::new(["s_serve_ace"], ["s_serve_error"]);
        assert_eq!(winners.winner("s_serve_ace").unwrap(), Side::Serving);
        assert_eq!(winners.winner("s_serve_error").unwrap(), Side::Receiving);
    }

    #[test]
    fn unassigned_terminal_is_fatal() {
        let winners = WinnerAssignment::new(["s_serve_ace"], ["s_serve_error"]);
        let err = winners.winner("r_net_touch").unwrap_err();
        assert!(matches!(err, VolleyError::UnrecognizedTerminal { state } if state == "r_net_touch"));
    }
}
