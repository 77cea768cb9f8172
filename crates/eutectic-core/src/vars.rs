//! Variables of the compiled numerical interface.
//!
//! Every evaluator in a build is compiled against one global argument
//! convention: state variables sorted by their string form, then site
//! fractions in model-declared order, then override parameters. The types
//! here carry that convention; the sort itself falls out of `Ord` being
//! string order.

use std::fmt;

use eutectic_expr::Symbol;
use serde::{Deserialize, Serialize};

/// An external condition variable shared across all phases.
///
/// Ordering and equality follow the symbol string, which is what the global
/// argument convention sorts by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVariable(String);

impl StateVariable {
    /// Temperature, `T`.
    pub fn temperature() -> Self {
        StateVariable("T".to_owned())
    }

    /// Pressure, `P`.
    pub fn pressure() -> Self {
        StateVariable("P".to_owned())
    }

    /// Total moles, `N`.
    pub fn moles() -> Self {
        StateVariable("N".to_owned())
    }

    /// A state variable outside the conventional triple.
    pub fn custom(symbol: impl Into<String>) -> Self {
        StateVariable(symbol.into())
    }

    /// The conventional set `{N, P, T}`, in sorted order.
    pub fn conventional() -> [StateVariable; 3] {
        [Self::moles(), Self::pressure(), Self::temperature()]
    }

    /// The expression symbol this variable binds to.
    pub fn symbol(&self) -> Symbol {
        Symbol::from(self.0.as_str())
    }
}

impl fmt::Display for StateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An internal composition variable of one phase's sublattice model.
///
/// Site fractions are never sorted globally; they keep the order the model
/// declares them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteFraction {
    phase: String,
    sublattice: usize,
    species: String,
}

impl SiteFraction {
    pub fn new(
        phase: impl Into<String>,
        sublattice: usize,
        species: impl Into<String>,
    ) -> Self {
        SiteFraction {
            phase: phase.into(),
            sublattice,
            species: species.into(),
        }
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn sublattice(&self) -> usize {
        self.sublattice
    }

    pub fn species(&self) -> &str {
        &self.species
    }

    /// The expression symbol this variable binds to.
    pub fn symbol(&self) -> Symbol {
        Symbol::from(format!("Y({},{},{})", self.phase, self.sublattice, self.species))
    }
}

impl fmt::Display for SiteFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Y({},{},{})", self.phase, self.sublattice, self.species)
    }
}

/// One slot of the ordered variable list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    State(StateVariable),
    SiteFraction(SiteFraction),
}

impl Variable {
    /// The expression symbol this slot binds to.
    pub fn symbol(&self) -> Symbol {
        match self {
            Variable::State(sv) => sv.symbol(),
            Variable::SiteFraction(y) => y.symbol(),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::State(sv) => sv.fmt(f),
            Variable::SiteFraction(y) => y.fmt(f),
        }
    }
}

/// The global argument convention: `state_variables` (already sorted)
/// followed by `site_fractions` in model-declared order.
pub fn ordered_variables(
    state_variables: &[StateVariable],
    site_fractions: &[SiteFraction],
) -> Vec<Variable> {
    let mut variables = Vec::with_capacity(state_variables.len() + site_fractions.len());
    variables.extend(state_variables.iter().cloned().map(Variable::State));
    variables.extend(site_fractions.iter().cloned().map(Variable::SiteFraction));
    variables
}

/// Expression symbols for an ordered variable list.
pub fn variable_symbols(variables: &[Variable]) -> Vec<Symbol> {
    variables.iter().map(Variable::symbol).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_variables_sort_by_string() {
        let mut svs = vec![
            StateVariable::temperature(),
            StateVariable::pressure(),
            StateVariable::moles(),
        ];
        svs.sort();
        let rendered: Vec<String> = svs.iter().map(|sv| sv.to_string()).collect();
        assert_eq!(rendered, vec!["N", "P", "T"]);
    }

    #[test]
    fn test_custom_state_variable_sorts_among_conventional() {
        let mut svs = vec![
            StateVariable::temperature(),
            StateVariable::custom("MU_B"),
            StateVariable::moles(),
        ];
        svs.sort();
        let rendered: Vec<String> = svs.iter().map(|sv| sv.to_string()).collect();
        assert_eq!(rendered, vec!["MU_B", "N", "T"]);
    }

    #[test]
    fn test_site_fraction_symbol_is_phase_qualified() {
        let y = SiteFraction::new("LIQUID", 0, "AL");
        assert_eq!(y.symbol().name(), "Y(LIQUID,0,AL)");
    }

    #[test]
    fn test_ordered_variables_layout() {
        let svs = vec![StateVariable::pressure(), StateVariable::temperature()];
        let ys = vec![
            SiteFraction::new("PHASE1", 0, "B"),
            SiteFraction::new("PHASE1", 0, "A"),
        ];
        let ordered = ordered_variables(&svs, &ys);
        let rendered: Vec<String> = ordered.iter().map(|x| x.to_string()).collect();
        // Site fractions keep declared order even when not sorted by name.
        assert_eq!(
            rendered,
            vec!["P", "T", "Y(PHASE1,0,B)", "Y(PHASE1,0,A)"]
        );
    }
}
