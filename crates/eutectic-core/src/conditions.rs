//! Equilibrium conditions, as far as record assembly cares about them.
//!
//! The solver interprets conditions fully; here they matter for two things:
//! a fixed state variable implies that variable must be part of the global
//! ordering, and the constraint builder receives the whole set untouched.

use serde::{Deserialize, Serialize};

use crate::vars::StateVariable;

/// One equilibrium condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Fix a state variable, e.g. `T = 1273.15`.
    FixedStateVariable(StateVariable, f64),
    /// Fix the overall mole fraction of an element, e.g. `x(AL) = 0.3`.
    MoleFraction { element: String, value: f64 },
}

/// An ordered condition set. Empty is valid (no conditions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    items: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Conditions::default()
    }

    /// Add a fixed-state-variable condition.
    pub fn with_state_variable(mut self, variable: StateVariable, value: f64) -> Self {
        self.items.push(Condition::FixedStateVariable(variable, value));
        self
    }

    /// Add a mole-fraction condition.
    pub fn with_mole_fraction(mut self, element: impl Into<String>, value: f64) -> Self {
        self.items.push(Condition::MoleFraction {
            element: element.into().to_uppercase(),
            value,
        });
        self
    }

    pub fn items(&self) -> &[Condition] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// State variables implied by the conditions.
    pub fn state_variables(&self) -> impl Iterator<Item = &StateVariable> {
        self.items.iter().filter_map(|c| match c {
            Condition::FixedStateVariable(sv, _) => Some(sv),
            Condition::MoleFraction { .. } => None,
        })
    }
}
