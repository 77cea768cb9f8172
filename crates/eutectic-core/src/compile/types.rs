//! Common types for the compilation pipeline.

use eutectic_expr::{CompiledFunction, CompiledGradient, CompiledHessian, Symbol};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintSet;
use crate::diagnostics::Diagnostics;
use crate::model::Property;
use crate::species::Species;
use crate::vars::{SiteFraction, StateVariable};

/// Configuration for callable building.
#[derive(Debug, Clone)]
pub struct CallableOptions {
    /// Parameter identifiers left as free trailing arguments instead of
    /// being baked in as constants. Deduplicated and sorted canonically
    /// before use.
    pub parameters: Vec<Symbol>,

    /// Build gradient evaluators.
    pub build_gradients: bool,

    /// Build Hessian evaluators.
    pub build_hessians: bool,

    /// State variables to include beyond those the models declare
    /// (typically total moles `N`).
    pub additional_state_variables: Vec<StateVariable>,
}

impl Default for CallableOptions {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            build_gradients: true,
            build_hessians: false,
            additional_state_variables: Vec::new(),
        }
    }
}

impl CallableOptions {
    /// Leave `parameter` as a free argument of every evaluator.
    pub fn with_parameter(mut self, parameter: impl Into<Symbol>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    /// Include `state_variable` in the global ordering.
    pub fn with_state_variable(mut self, state_variable: StateVariable) -> Self {
        self.additional_state_variables.push(state_variable);
        self
    }
}

/// Configuration for record assembly.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    /// Override values for free parameters, keyed by identifier.
    pub parameters: FxHashMap<Symbol, f64>,

    /// Build gradient evaluators (only if callables must be built).
    pub build_gradients: bool,

    /// Build Hessian evaluators (only if callables must be built).
    pub build_hessians: bool,
}

impl RecordOptions {
    /// Override `parameter` with `value`.
    pub fn with_parameter(mut self, parameter: impl Into<Symbol>, value: f64) -> Self {
        self.parameters.insert(parameter.into(), value);
        self
    }
}

/// The callables bundle for one output property: per-phase evaluators plus
/// the orderings they were compiled against.
///
/// Phase keys are uppercase phase names. The gradient/Hessian maps are
/// empty when the corresponding build flag was off; the mass sequences are
/// ordered by pure element, identically for every phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callables {
    /// Output property every evaluator here samples.
    pub output: Property,

    /// Ordered state variables the evaluators were compiled against.
    pub state_variables: Vec<StateVariable>,

    /// Canonically sorted parameter symbols, appended to every evaluator's
    /// argument list.
    pub parameters: Vec<Symbol>,

    /// Output-property evaluator per phase.
    pub functions: FxHashMap<String, CompiledFunction>,

    /// Output-property gradients per phase.
    pub gradients: FxHashMap<String, CompiledGradient>,

    /// Output-property Hessians per phase.
    pub hessians: FxHashMap<String, CompiledHessian>,

    /// Moles-of-element evaluators per phase, one per pure element.
    pub mass_functions: FxHashMap<String, Vec<CompiledFunction>>,

    /// Moles-of-element gradients per phase.
    pub mass_gradients: FxHashMap<String, Vec<CompiledGradient>>,

    /// Moles-of-element Hessians per phase.
    pub mass_hessians: FxHashMap<String, Vec<CompiledHessian>>,
}

impl Callables {
    pub(crate) fn new(
        output: Property,
        state_variables: Vec<StateVariable>,
        parameters: Vec<Symbol>,
    ) -> Self {
        Callables {
            output,
            state_variables,
            parameters,
            functions: FxHashMap::default(),
            gradients: FxHashMap::default(),
            hessians: FxHashMap::default(),
            mass_functions: FxHashMap::default(),
            mass_gradients: FxHashMap::default(),
            mass_hessians: FxHashMap::default(),
        }
    }

    /// Phases covered by the bundle.
    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/// Result of a callable build: the bundle plus the diagnostics produced
/// while building it.
#[derive(Debug, Clone)]
pub struct CallablesBuild {
    pub callables: Callables,
    pub diagnostics: Diagnostics,
}

/// The terminal per-phase artifact handed to the equilibrium solver.
///
/// Records are constructed once per (phase set, output, parameter set,
/// state-variable set) combination and treated as read-only afterwards;
/// when any input changes, rebuild instead of patching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Resolved component species, sorted by name.
    pub components: Vec<Species>,

    /// Ordered state variables (sorted by string form).
    pub state_variables: Vec<StateVariable>,

    /// Site fractions in model-declared order, following the state
    /// variables in every evaluator's argument list.
    pub site_fractions: Vec<SiteFraction>,

    /// Canonically sorted free parameter symbols.
    pub parameters: Vec<Symbol>,

    /// Override values parallel to `parameters`.
    pub parameter_values: Vec<f64>,

    /// Output-property evaluator.
    pub function: CompiledFunction,

    /// Output-property gradient, when built.
    pub gradient: Option<CompiledGradient>,

    /// Output-property Hessian, when built.
    pub hessian: Option<CompiledHessian>,

    /// Moles-of-element evaluators, one per pure element in sorted element
    /// order.
    pub mass_functions: Vec<CompiledFunction>,

    /// Moles-of-element gradients, when built.
    pub mass_gradients: Option<Vec<CompiledGradient>>,

    /// Moles-of-element Hessians, when built.
    pub mass_hessians: Option<Vec<CompiledHessian>>,

    /// Constraint evaluators and row counts for this phase.
    pub constraints: ConstraintSet,
}

impl PhaseRecord {
    /// Length of the evaluators' argument lists:
    /// `state_variables ++ site_fractions ++ parameters`.
    pub fn arity(&self) -> usize {
        self.state_variables.len() + self.site_fractions.len() + self.parameters.len()
    }
}

/// Result of record assembly: records keyed by uppercase phase name, plus
/// diagnostics.
#[derive(Debug, Clone)]
pub struct RecordsBuild {
    pub records: FxHashMap<String, PhaseRecord>,
    pub diagnostics: Diagnostics,
}
