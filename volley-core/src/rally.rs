//! Single-rally random walk.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::canonical::canonical_winners;
use crate::error::{VolleyError, VolleyResult};
use crate::machine::{StateMachine, PROBABILITY_TOLERANCE};
use crate::state::Side;
use crate::winner::WinnerAssignment;

/// Default cap on continuation steps per rally.
pub const DEFAULT_MAX_STEPS: usize = 50;

/// How a rally ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RallyOutcome {
    /// A terminal state was reached and awarded the point.
    Won { side: Side, terminal: String },
    /// The step cap was hit before any terminal state.
    StepBudgetExceeded { max_steps: usize },
}

impl std::fmt::Display for RallyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won { side, terminal } => write!(f, "{side} team wins ({terminal})"),
            Self::StepBudgetExceeded { max_steps } => {
                write!(f, "rally exceeded {max_steps} steps")
            }
        }
    }
}

/// A completed walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rally {
    /// Visited states, starting with the initial state. Ends with the
    /// terminal state when the rally was decided.
    pub sequence: Vec<String>,
    /// Continuation steps taken.
    pub steps: usize,
    pub outcome: RallyOutcome,
}

impl Rally {
    /// Winning side, if the rally was decided.
    pub fn winner(&self) -> Option<Side> {
        match &self.outcome {
            RallyOutcome::Won { side, .. } => Some(*side),
            RallyOutcome::StepBudgetExceeded { .. } => None,
        }
    }

    /// Check if a terminal state was reached.
    pub fn is_decided(&self) -> bool {
        self.winner().is_some()
    }
}

/// Walks a machine from its initial state to a terminal state.
#[derive(Debug, Clone)]
pub struct RallySimulator {
    winners: WinnerAssignment,
    max_steps: usize,
}

impl Default for RallySimulator {
    fn default() -> Self {
        Self::new(canonical_winners())
    }
}

impl RallySimulator {
    /// Create a simulator interpreting terminal states with `winners`.
    pub fn new(winners: WinnerAssignment) -> Self {
        Self {
            winners,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the step cap.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Step cap.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Win partition.
    pub fn winners(&self) -> &WinnerAssignment {
        &self.winners
    }

    /// Draw the next state. Terminal states yield `None`.
    ///
    /// Probabilities are used as relative weights, so rows within the sum
    /// tolerance sample correctly without being rescaled first.
    pub fn step<'m, R>(
        &self,
        machine: &'m StateMachine,
        state: &str,
        rng: &mut R,
    ) -> VolleyResult<Option<&'m str>>
    where
        R: Rng + ?Sized,
    {
        if machine.is_terminal(state) {
            return Ok(None);
        }
        let row = machine.transitions_from(state)?;
        let next = row
            .choose_weighted(rng, |t| t.probability)
            .map_err(|_| VolleyError::InvalidDistribution {
                state: state.to_string(),
                sum: row.iter().map(|t| t.probability).sum(),
                tolerance: PROBABILITY_TOLERANCE,
            })?;
        Ok(Some(next.to.as_str()))
    }

    /// Walk one rally.
    ///
    /// Hitting the step cap is reported as
    /// [`RallyOutcome::StepBudgetExceeded`], never as a win. A terminal state
    /// missing from the win partition is an error.
    pub fn run<R>(&self, machine: &StateMachine, rng: &mut R) -> VolleyResult<Rally>
    where
        R: Rng + ?Sized,
    {
        let mut current = machine.initial_state();
        let mut sequence = vec![current.to_string()];
        let mut steps = 0;

        while steps < self.max_steps {
            match self.step(machine, current, rng)? {
                Some(next) => current = next,
                None => break,
            }
            sequence.push(current.to_string());
            steps += 1;
        }

        let outcome = if machine.is_terminal(current) {
            let side = self.winners.winner(current)?;
            RallyOutcome::Won {
                side,
                terminal: current.to_string(),
            }
        } else {
            RallyOutcome::StepBudgetExceeded {
                max_steps: self.max_steps,
            }
        };
        trace!("Rally finished after {} steps: {}", steps, outcome);

        Ok(Rally {
            sequence,
            steps,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_machine;
    use crate::machine::DEFAULT_INITIAL_STATE;
    use crate::state::{ActionKind, Transition};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::{BTreeMap, BTreeSet};

    fn looping_machine() -> StateMachine {
        let mut transitions = BTreeMap::new();
        transitions.insert(
            "s_serve_ready".to_string(),
            vec![Transition::new("r_dig_good", 1.0, ActionKind::Serve)],
        );
        transitions.insert(
            "r_dig_good".to_string(),
            vec![Transition::new("s_serve_ready", 1.0, ActionKind::Dig)],
        );
        let terminal: BTreeSet<String> = ["s_serve_ace".to_string()].into();
        StateMachine::new(transitions, terminal, DEFAULT_INITIAL_STATE).unwrap()
    }

    #[test]
    fn first_step_from_serve() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let next = sim.step(&sm, "s_serve_ready", &mut rng).unwrap().unwrap();
            assert!(["s_serve_ace", "s_serve_error", "s_serve_in_play"].contains(&next));
            assert!(sm.is_valid_transition("s_serve_ready", next));
        }
    }

    #[test]
    fn step_from_terminal_is_none() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(sim.step(&sm, "s_serve_ace", &mut rng).unwrap(), None);
    }

    #[test]
    fn step_from_unknown_state_fails() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(matches!(
            sim.step(&sm, "r_timeout", &mut rng),
            Err(VolleyError::UnknownState { .. })
        ));
    }

    #[test]
    fn complete_rallies_end_in_terminal_states() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for _ in 0..500 {
            let rally = sim.run(&sm, &mut rng).unwrap();
            assert_eq!(rally.sequence[0], "s_serve_ready");
            let last = rally.sequence.last().unwrap();
            assert_eq!(sm.is_terminal(last), rally.is_decided());
            assert!(rally.steps <= sim.max_steps());
            for pair in rally.sequence.windows(2) {
                assert!(sm.is_valid_transition(&pair[0], &pair[1]));
            }
            if let RallyOutcome::Won { side, terminal } = &rally.outcome {
                assert_eq!(*side, sim.winners().winner(terminal).unwrap());
            }
        }
    }

    #[test]
    fn step_budget_is_reported_not_coerced() {
        let sm = looping_machine();
        let sim = RallySimulator::default().with_max_steps(10);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let rally = sim.run(&sm, &mut rng).unwrap();
        assert_eq!(
            rally.outcome,
            RallyOutcome::StepBudgetExceeded { max_steps: 10 }
        );
        assert_eq!(rally.winner(), None);
        assert_eq!(rally.steps, 10);
        assert_eq!(rally.sequence.len(), 11);
        assert!(!sm.is_terminal(rally.sequence.last().unwrap()));
    }

    #[test]
    fn zero_step_budget_keeps_initial_state() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::default().with_max_steps(0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let rally = sim.run(&sm, &mut rng).unwrap();
        assert_eq!(rally.sequence, vec!["s_serve_ready".to_string()]);
        assert_eq!(rally.steps, 0);
        assert_eq!(
            rally.outcome,
            RallyOutcome::StepBudgetExceeded { max_steps: 0 }
        );
    }

    #[test]
    fn unassigned_terminal_is_an_error() {
        let sm = canonical_machine().unwrap();
        let sim = RallySimulator::new(WinnerAssignment::new(
            Vec::<String>::new(),
            Vec::<String>::new(),
        ));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(matches!(
            sim.run(&sm, &mut rng),
            Err(VolleyError::UnrecognizedTerminal { .. })
        ));
    }

    #[test]
    fn outcome_display() {
        let won = RallyOutcome::Won {
            side: Side::Serving,
            terminal: "s_serve_ace".to_string(),
        };
        assert_eq!(won.to_string(), "serving team wins (s_serve_ace)");
        let capped = RallyOutcome::StepBudgetExceeded { max_steps: 50 };
        assert_eq!(capped.to_string(), "rally exceeded 50 steps");
    }
}
