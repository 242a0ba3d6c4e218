//! Team probability templates.
//!
//! A template is how a team describes its own skill profile: for each state,
//! an ordered list of `(next_state, probability)` pairs. Action kinds are
//! not part of the format; they are inferred when a machine is built.
//!
//! On disk a template is JSON:
//!
//! ```json
//! { "s_serve_ready": [["s_serve_ace", 0.08], ["s_serve_error", 0.12], ["s_serve_in_play", 0.80]] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VolleyError, VolleyResult};
use crate::machine::{check_distribution, StateMachine};
use crate::state::Side;

/// One template row.
pub type TemplateRow = Vec<(String, f64)>;

/// Per-state outgoing probabilities, keyed by state name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityTemplate {
    rows: BTreeMap<String, TemplateRow>,
}

impl ProbabilityTemplate {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row for a state, replacing any existing one.
    pub fn insert<S, I, N>(&mut self, state: S, row: I) -> &mut Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (N, f64)>,
        N: Into<String>,
    {
        self.rows.insert(
            state.into(),
            row.into_iter().map(|(to, p)| (to.into(), p)).collect(),
        );
        self
    }

    /// Builder-style [`ProbabilityTemplate::insert`].
    pub fn with_row<S, I, N>(mut self, state: S, row: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (N, f64)>,
        N: Into<String>,
    {
        self.insert(state, row);
        self
    }

    /// Row for a state.
    pub fn get(&self, state: &str) -> Option<&TemplateRow> {
        self.rows.get(state)
    }

    /// Check if a state has a row.
    pub fn contains(&self, state: &str) -> bool {
        self.rows.contains_key(state)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the template has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows in state order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TemplateRow)> {
        self.rows.iter()
    }

    /// Check that every row sums to 1 within tolerance.
    pub fn validate(&self) -> VolleyResult<()> {
        for (state, row) in &self.rows {
            check_distribution(state, row.iter().map(|(_, p)| *p))?;
        }
        Ok(())
    }

    /// Key union of two templates; rows of `other` win on conflict.
    pub fn merge(&self, other: &ProbabilityTemplate) -> ProbabilityTemplate {
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { rows }
    }

    /// Rows whose state name carries the given side prefix.
    pub fn side(&self, side: Side) -> ProbabilityTemplate {
        let rows = self
            .rows
            .iter()
            .filter(|(state, _)| Side::from_prefix(state) == Some(side))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { rows }
    }

    /// Split into serving-side (`s_`) and receiving-side (`r_`) halves.
    ///
    /// Rows with neither prefix fail, since they would otherwise drop out
    /// of every composed machine.
    pub fn split_by_side(&self) -> VolleyResult<(ProbabilityTemplate, ProbabilityTemplate)> {
        if let Some(state) = self.rows.keys().find(|s| Side::from_prefix(s).is_none()) {
            return Err(VolleyError::UnknownSide {
                state: state.clone(),
            });
        }
        Ok((self.side(Side::Serving), self.side(Side::Receiving)))
    }

    /// Template view of a machine: every continuation row, without action kinds.
    pub fn from_machine(machine: &StateMachine) -> Self {
        let rows = machine
            .rows()
            .map(|(state, row)| {
                let row = row.iter().map(|t| (t.to.clone(), t.probability)).collect();
                (state.to_string(), row)
            })
            .collect();
        Self { rows }
    }

    /// Parse a template from JSON.
    pub fn from_json(json: &str) -> VolleyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a template from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> VolleyResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl FromIterator<(String, TemplateRow)> for ProbabilityTemplate {
    fn from_iter<T: IntoIterator<Item = (String, TemplateRow)>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
