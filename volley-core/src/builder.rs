//! Compose team templates into a single-point machine.

use std::collections::BTreeMap;

use tracing::debug;

use crate::canonical::{canonical_machine, canonical_terminal_states};
use crate::error::VolleyResult;
use crate::machine::{StateMachine, DEFAULT_INITIAL_STATE};
use crate::state::{ActionKind, Transition};
use crate::template::ProbabilityTemplate;

/// Builds a [`StateMachine`] from a serving-side and a receiving-side
/// template.
///
/// The terminal set and initial state always come from the reference
/// machine. Rows are merged by state key; the receiving template wins when
/// both define the same state.
#[derive(Debug, Clone, Default)]
pub struct MachineBuilder {
    serving: ProbabilityTemplate,
    receiving: ProbabilityTemplate,
    fill_from_canonical: bool,
}

impl MachineBuilder {
    /// Create a builder with empty templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Template supplying serving-side rows.
    pub fn serving(mut self, template: ProbabilityTemplate) -> Self {
        self.serving = template;
        self
    }

    /// Template supplying receiving-side rows.
    pub fn receiving(mut self, template: ProbabilityTemplate) -> Self {
        self.receiving = template;
        self
    }

    /// Fill continuation states missing from both templates with the
    /// reference machine's rows. Off by default.
    pub fn fill_from_canonical(mut self, enabled: bool) -> Self {
        self.fill_from_canonical = enabled;
        self
    }

    /// Validate both templates and build the machine.
    pub fn build(&self) -> VolleyResult<StateMachine> {
        self.serving.validate()?;
        self.receiving.validate()?;

        let mut merged = self.serving.merge(&self.receiving);
        if self.fill_from_canonical {
            let reference = ProbabilityTemplate::from_machine(&canonical_machine()?);
            let missing: Vec<_> = reference
                .iter()
                .filter(|(state, _)| !merged.contains(state))
                .map(|(state, row)| (state.clone(), row.clone()))
                .collect();
            if !missing.is_empty() {
                debug!("Filling {} rows from reference machine", missing.len());
            }
            for (state, row) in missing {
                merged.insert(state, row);
            }
        }

        let transitions: BTreeMap<String, Vec<Transition>> = merged
            .iter()
            .map(|(state, row)| {
                let action = ActionKind::infer(state);
                let row = row
                    .iter()
                    .map(|(to, p)| Transition::new(to.clone(), *p, action))
                    .collect();
                (state.clone(), row)
            })
            .collect();

        StateMachine::new(transitions, canonical_terminal_states(), DEFAULT_INITIAL_STATE)
    }
}
