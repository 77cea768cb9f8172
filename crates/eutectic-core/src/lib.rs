//! Core engine for CALPHAD phase-record construction.
//!
//! This crate provides:
//! - Phase models (sublattice structure, energy and mass expressions)
//! - Callable building (per-phase evaluator bundles over a shared ordering)
//! - Constraint construction (site-fraction balances, mass residuals)
//! - Record assembly (immutable per-phase solver inputs)

pub mod compile;
pub mod conditions;
pub mod constraints;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod species;
pub mod vars;

pub use compile::{
    build_callables, build_phase_records, build_phase_records_unchecked, CallableOptions,
    Callables, CallablesBuild, PhaseRecord, RecordOptions, RecordsBuild,
};
pub use conditions::{Condition, Conditions};
pub use constraints::{
    ConstraintBuilder, ConstraintFunctions, ConstraintSet, SublatticeConstraints,
};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, Result};
pub use model::{model_map, ModelMap, PhaseModel, Property, Sublattice, SublatticeModel};
pub use species::{pure_elements, Database, Species, VACANCY};
pub use vars::{ordered_variables, variable_symbols, SiteFraction, StateVariable, Variable};
