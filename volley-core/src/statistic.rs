//! Symbolic skill statistics.
//!
//! Each statistic names exactly one `(state, destination)` transition of the
//! reference machine. The table is exhaustive and matched by exact state
//! name; it is part of the public contract and must stay stable.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VolleyError;

/// A trainable (or observable) transition probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    ServeAceRate,
    ServeErrorRate,
    ServeInPlayRate,
    ReceptionPerfectRate,
    ReceptionGoodRate,
    ReceptionErrorRate,
    AttackKillFromPerfectSet,
    AttackErrorFromPerfectSet,
    AttackDefendedFromPerfectSet,
    AttackKillFromGoodSet,
    AttackErrorFromGoodSet,
    DigPerfectRate,
    DigGoodRate,
    DigErrorRate,
    BlockKillRate,
    BlockErrorRate,
}

impl Statistic {
    /// Every statistic, in table order.
    pub const ALL: [Statistic; 16] = [
        Self::ServeAceRate,
        Self::ServeErrorRate,
        Self::ServeInPlayRate,
        Self::ReceptionPerfectRate,
        Self::ReceptionGoodRate,
        Self::ReceptionErrorRate,
        Self::AttackKillFromPerfectSet,
        Self::AttackErrorFromPerfectSet,
        Self::AttackDefendedFromPerfectSet,
        Self::AttackKillFromGoodSet,
        Self::AttackErrorFromGoodSet,
        Self::DigPerfectRate,
        Self::DigGoodRate,
        Self::DigErrorRate,
        Self::BlockKillRate,
        Self::BlockErrorRate,
    ];

    /// Skills a coach can train; the default elasticity sweep.
    pub const TRAINABLE: [Statistic; 7] = [
        Self::ServeAceRate,
        Self::ReceptionPerfectRate,
        Self::ReceptionGoodRate,
        Self::AttackKillFromPerfectSet,
        Self::AttackKillFromGoodSet,
        Self::DigPerfectRate,
        Self::BlockKillRate,
    ];

    /// Stable symbolic name.
    pub fn name(&self) -> &'static str {
        self.spec().0
    }

    /// Source state of the targeted transition.
    pub fn state(&self) -> &'static str {
        self.spec().1
    }

    /// Destination state of the targeted transition.
    pub fn destination(&self) -> &'static str {
        self.spec().2
    }

    fn spec(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::ServeAceRate => ("serve_ace_rate", "s_serve_ready", "s_serve_ace"),
            Self::ServeErrorRate => ("serve_error_rate", "s_serve_ready", "s_serve_error"),
            Self::ServeInPlayRate => ("serve_in_play_rate", "s_serve_ready", "s_serve_in_play"),
            Self::ReceptionPerfectRate => (
                "reception_perfect_rate",
                "s_serve_in_play",
                "r_reception_perfect",
            ),
            Self::ReceptionGoodRate => (
                "reception_good_rate",
                "s_serve_in_play",
                "r_reception_good",
            ),
            Self::ReceptionErrorRate => (
                "reception_error_rate",
                "s_serve_in_play",
                "r_reception_error",
            ),
            Self::AttackKillFromPerfectSet => (
                "attack_kill_from_perfect_set",
                "r_set_perfect",
                "r_attack_kill",
            ),
            Self::AttackErrorFromPerfectSet => (
                "attack_error_from_perfect_set",
                "r_set_perfect",
                "r_attack_error",
            ),
            Self::AttackDefendedFromPerfectSet => (
                "attack_defended_from_perfect_set",
                "r_set_perfect",
                "r_attack_defended",
            ),
            Self::AttackKillFromGoodSet => (
                "attack_kill_from_good_set",
                "r_set_good",
                "r_attack_kill",
            ),
            Self::AttackErrorFromGoodSet => (
                "attack_error_from_good_set",
                "r_set_good",
                "r_attack_error",
            ),
            Self::DigPerfectRate => ("dig_perfect_rate", "r_attack_defended", "s_dig_perfect"),
            Self::DigGoodRate => ("dig_good_rate", "r_attack_defended", "s_dig_good"),
            Self::DigErrorRate => ("dig_error_rate", "r_attack_defended", "s_dig_error"),
            Self::BlockKillRate => ("block_kill_rate", "r_attack_blocked", "s_block_kill"),
            Self::BlockErrorRate => ("block_error_rate", "r_attack_blocked", "s_block_error"),
        }
    }

    /// Title-cased name for reports, e.g. "Serve Ace Rate".
    pub fn label(&self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = VolleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|stat| stat.name() == s)
            .copied()
            .ok_or_else(|| VolleyError::TargetNotFound {
                statistic: s.to_string(),
            })
    }
}
