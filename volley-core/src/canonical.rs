//! Reference beach volleyball rally machine.
//!
//! The table below is versioned by [`MODEL_VERSION`](crate::MODEL_VERSION).
//! It is the baseline for elasticity analysis and supplies the terminal set
//! and initial state of every machine built from team templates. Action
//! kinds are inferred from the source state, as [`MachineBuilder`] does.
//!
//! [`MachineBuilder`]: crate::builder::MachineBuilder

use std::collections::{BTreeMap, BTreeSet};

use crate::error::VolleyResult;
use crate::machine::{StateMachine, DEFAULT_INITIAL_STATE};
use crate::state::{ActionKind, Transition};
use crate::winner::WinnerAssignment;

type Edge = (&'static str, f64);

const TABLE: &[(&str, &[Edge])] = &[
    (
        "s_serve_ready",
        &[
            ("s_serve_ace", 0.08),
            ("s_serve_error", 0.12),
            ("s_serve_in_play", 0.80),
        ],
    ),
    (
        "s_serve_in_play",
        &[
            ("r_reception_error", 0.15),
            ("r_reception_perfect", 0.35),
            ("r_reception_good", 0.50),
        ],
    ),
    (
        "r_reception_perfect",
        &[
            ("r_set_error", 0.08),
            ("r_set_perfect", 0.57),
            ("r_set_good", 0.35),
        ],
    ),
    (
        "r_reception_good",
        &[
            ("r_set_error", 0.18),
            ("r_set_perfect", 0.17),
            ("r_set_good", 0.50),
            ("r_set_poor", 0.15),
        ],
    ),
    (
        "r_set_perfect",
        &[
            ("r_attack_kill", 0.42),
            ("r_attack_error", 0.10),
            ("r_attack_blocked", 0.18),
            ("r_attack_defended", 0.30),
        ],
    ),
    (
        "r_set_good",
        &[
            ("r_attack_kill", 0.28),
            ("r_attack_error", 0.12),
            ("r_attack_blocked", 0.27),
            ("r_attack_defended", 0.33),
        ],
    ),
    (
        "r_set_poor",
        &[
            ("r_attack_kill", 0.12),
            ("r_attack_error", 0.28),
            ("r_attack_blocked", 0.35),
            ("r_attack_defended", 0.25),
        ],
    ),
    (
        "r_attack_blocked",
        &[
            ("s_block_kill", 0.20),
            ("s_block_error", 0.15),
            ("s_dig_perfect", 0.35),
            ("s_dig_good", 0.30),
        ],
    ),
    (
        "r_attack_defended",
        &[
            ("s_dig_error", 0.30),
            ("s_dig_perfect", 0.35),
            ("s_dig_good", 0.35),
        ],
    ),
    (
        "s_dig_perfect",
        &[
            ("s_set_error", 0.08),
            ("s_set_perfect", 0.57),
            ("s_set_good", 0.35),
        ],
    ),
    (
        "s_dig_good",
        &[
            ("s_set_error", 0.18),
            ("s_set_perfect", 0.17),
            ("s_set_good", 0.50),
            ("s_set_poor", 0.15),
        ],
    ),
    (
        "s_set_perfect",
        &[
            ("s_attack_kill", 0.42),
            ("s_attack_error", 0.10),
            ("s_attack_blocked", 0.18),
            ("s_attack_defended", 0.30),
        ],
    ),
    (
        "s_set_good",
        &[
            ("s_attack_kill", 0.28),
            ("s_attack_error", 0.12),
            ("s_attack_blocked", 0.27),
            ("s_attack_defended", 0.33),
        ],
    ),
    (
        "s_set_poor",
        &[
            ("s_attack_kill", 0.12),
            ("s_attack_error", 0.28),
            ("s_attack_blocked", 0.35),
            ("s_attack_defended", 0.25),
        ],
    ),
    (
        "s_attack_blocked",
        &[
            ("r_block_kill", 0.20),
            ("r_block_error", 0.15),
            ("r_dig_perfect", 0.35),
            ("r_dig_good", 0.30),
        ],
    ),
    (
        "s_attack_defended",
        &[
            ("r_dig_error", 0.30),
            ("r_dig_perfect", 0.35),
            ("r_dig_good", 0.35),
        ],
    ),
    (
        "r_dig_perfect",
        &[
            ("r_set_error", 0.05),
            ("r_set_perfect", 0.60),
            ("r_set_good", 0.35),
        ],
    ),
    (
        "r_dig_good",
        &[
            ("r_set_error", 0.15),
            ("r_set_perfect", 0.20),
            ("r_set_good", 0.50),
            ("r_set_poor", 0.15),
        ],
    ),
];

/// Terminal states won by the serving side.
const SERVING_WINS: &[&str] = &[
    "s_serve_ace",
    "r_reception_error",
    "r_set_error",
    "r_attack_error",
    "s_block_kill",
    "s_attack_kill",
    "r_dig_error",
    "r_block_error",
];

/// Terminal states won by the receiving side.
const RECEIVING_WINS: &[&str] = &[
    "s_serve_error",
    "r_attack_kill",
    "s_dig_error",
    "s_block_error",
    "s_set_error",
    "s_attack_error",
    "r_block_kill",
];

/// The reference machine.
pub fn canonical_machine() -> VolleyResult<StateMachine> {
    let transitions: BTreeMap<String, Vec<Transition>> = TABLE
        .iter()
        .map(|(state, edges)| {
            let action = ActionKind::infer(state);
            let row = edges
                .iter()
                .map(|(to, p)| Transition::new(*to, *p, action))
                .collect();
            (state.to_string(), row)
        })
        .collect();
    StateMachine::new(transitions, canonical_terminal_states(), DEFAULT_INITIAL_STATE)
}

/// Terminal states of the reference machine.
pub fn canonical_terminal_states() -> BTreeSet<String> {
    SERVING_WINS
        .iter()
        .chain(RECEIVING_WINS)
        .map(|s| s.to_string())
        .collect()
}

/// Win partition of the reference machine.
pub fn canonical_winners() -> WinnerAssignment {
    WinnerAssignment::new(SERVING_WINS.iter().copied(), RECEIVING_WINS.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::PROBABILITY_TOLERANCE;
    use crate::state::Side;

    #[test]
    fn canonical_machine_is_valid() {
        let sm = canonical_machine().unwrap();
        assert_eq!(sm.initial_state(), "s_serve_ready");
        assert_eq!(sm.continuation_states().len(), 18);
        assert_eq!(sm.terminal_states().len(), 15);
        assert!(sm.validate().is_ok());
    }

    #[test]
    fn every_row_sums_to_one() {
        let sm = canonical_machine().unwrap();
        for (state, row) in sm.rows() {
            let sum: f64 = row.iter().map(|t| t.probability).sum();
            assert!(
                (sum - 1.0).abs() <= PROBABILITY_TOLERANCE,
                "{state} sums to {sum}"
            );
        }
    }

    #[test]
    fn serve_row_matches_reference() {
        let sm = canonical_machine().unwrap();
        let serve: Vec<_> = sm
            .transitions_from("s_serve_ready")
            .unwrap()
            .iter()
            .map(|t| (t.to.as_str(), t.probability))
            .collect();
        assert_eq!(
            serve,
            vec![
                ("s_serve_ace", 0.08),
                ("s_serve_error", 0.12),
                ("s_serve_in_play", 0.80)
            ]
        );
    }

    #[test]
    fn matches_machine_built_from_its_own_template() {
        let sm = canonical_machine().unwrap();
        let (serving, receiving) = crate::template::ProbabilityTemplate::from_machine(&sm)
            .split_by_side()
            .unwrap();
        let rebuilt = crate::builder::MachineBuilder::new()
            .serving(serving)
            .receiving(receiving)
            .build()
            .unwrap();
        assert_eq!(rebuilt, sm);
        let blocked = sm.transitions_from("r_attack_blocked").unwrap();
        assert!(blocked.iter().all(|t| t.action == ActionKind::Attack));
    }

    #[test]
    fn winners_cover_every_terminal() {
        let sm = canonical_machine().unwrap();
        let winners = canonical_winners();
        assert!(winners.covers(&sm).is_ok());
        assert_eq!(winners.winner("s_serve_ace").unwrap(), Side::Serving);
        assert_eq!(winners.winner("s_serve_error").unwrap(), Side::Receiving);
        assert_eq!(winners.winner("r_attack_kill").unwrap(), Side::Receiving);
        assert_eq!(winners.winner("s_block_kill").unwrap(), Side::Serving);
    }

    #[test]
    fn win_partitions_are_disjoint() {
        let winners = canonical_winners();
        assert!(winners
            .serving_wins()
            .is_disjoint(winners.receiving_wins()));
    }
}
