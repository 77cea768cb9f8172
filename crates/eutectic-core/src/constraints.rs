//! Constraint evaluators consumed by the equilibrium solver.
//!
//! Constraints are built per phase, over the same ordered variable list and
//! canonical parameter ordering as the phase's callables. Getting either
//! ordering wrong does not fail loudly; it silently mis-addresses argument
//! slots. The pipeline therefore computes the ordering once per build and
//! hands it to [`ConstraintBuilder::build`] verbatim.

use eutectic_expr::{
    BuildOptions, BuiltFunctions, CompiledFunction, CompiledGradient, CompiledHessian, Expr,
    Symbol, build_functions,
};
use serde::{Deserialize, Serialize};

use crate::conditions::Conditions;
use crate::error::{Error, Result};
use crate::model::PhaseModel;
use crate::vars::{Variable, variable_symbols};

/// A vector-valued constraint: one residual evaluator per constraint row,
/// with matching jacobian rows and Hessians.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintFunctions {
    /// Residual evaluators, one per constraint.
    pub functions: Vec<CompiledFunction>,

    /// First derivatives of each residual with respect to the ordered
    /// variables.
    pub jacobian: Vec<CompiledGradient>,

    /// Second derivatives of each residual.
    pub hessians: Vec<CompiledHessian>,
}

impl ConstraintFunctions {
    fn push(&mut self, built: BuiltFunctions) {
        if let Some(f) = built.function {
            self.functions.push(f);
        }
        if let Some(g) = built.gradient {
            self.jacobian.push(g);
        }
        if let Some(h) = built.hessian {
            self.hessians.push(h);
        }
    }
}

/// The constraint bundle for one phase: internal and multiphase groups plus
/// their explicit row counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Phase-internal constraints (site-fraction balances).
    pub internal: ConstraintFunctions,

    /// Cross-phase constraints this phase contributes rows to.
    pub multiphase: ConstraintFunctions,

    /// Number of internal constraint rows.
    pub num_internal_constraints: usize,

    /// Number of multiphase constraint rows.
    pub num_multiphase_constraints: usize,
}

/// Builds constraint evaluators for one phase.
///
/// Implementations must compile every evaluator over exactly the
/// `variables ++ parameters` argument order they are given.
pub trait ConstraintBuilder: Send + Sync {
    fn build(
        &self,
        model: &dyn PhaseModel,
        variables: &[Variable],
        conditions: &Conditions,
        parameters: &[Symbol],
    ) -> Result<ConstraintSet>;
}

/// Default constraint builder for sublattice models.
///
/// Internal constraints: one site-fraction balance `sum(y) - 1` per
/// sublattice. Multiphase constraints: one moles-of-element residual per
/// pure element of the system, in sorted element order, so every phase
/// contributes rows aligned with the mass-balance rows the solver assembles
/// across phases. A phase that does not contain an element still gets that
/// element's row; its residual is identically zero.
#[derive(Debug, Clone)]
pub struct SublatticeConstraints {
    elements: Vec<String>,
}

impl SublatticeConstraints {
    /// Constraint builder over the system's pure elements, normally the
    /// list derived from the component set.
    pub fn for_elements<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut elements: Vec<String> = elements
            .into_iter()
            .map(|element| element.into().to_uppercase())
            .collect();
        elements.sort();
        elements.dedup();
        SublatticeConstraints { elements }
    }

    /// Site-fraction balance residuals, grouped by sublattice index.
    fn balance_residuals(model: &dyn PhaseModel) -> Vec<Expr> {
        let mut residuals: Vec<Vec<Expr>> = Vec::new();
        for y in model.site_fractions() {
            if y.sublattice() >= residuals.len() {
                residuals.resize(y.sublattice() + 1, Vec::new());
            }
            residuals[y.sublattice()].push(Expr::Sym(y.symbol()));
        }
        residuals
            .into_iter()
            .filter(|terms| !terms.is_empty())
            .map(|terms| Expr::add(terms) - Expr::ONE)
            .collect()
    }
}

impl ConstraintBuilder for SublatticeConstraints {
    fn build(
        &self,
        model: &dyn PhaseModel,
        variables: &[Variable],
        _conditions: &Conditions,
        parameters: &[Symbol],
    ) -> Result<ConstraintSet> {
        let variable_symbols = variable_symbols(variables);
        let options = BuildOptions::with_derivatives(true, true);
        let phase = model.phase_name();

        let mut internal = ConstraintFunctions::default();
        for residual in Self::balance_residuals(model) {
            let built = build_functions(&residual, &variable_symbols, parameters, &options)
                .map_err(|source| Error::Compile {
                    phase: phase.to_owned(),
                    source,
                })?;
            internal.push(built);
        }

        let mut multiphase = ConstraintFunctions::default();
        for element in &self.elements {
            let residual = model.moles_of(element);
            let built = build_functions(&residual, &variable_symbols, parameters, &options)
                .map_err(|source| Error::Compile {
                    phase: phase.to_owned(),
                    source,
                })?;
            multiphase.push(built);
        }

        let num_internal_constraints = internal.functions.len();
        let num_multiphase_constraints = multiphase.functions.len();
        Ok(ConstraintSet {
            internal,
            multiphase,
            num_internal_constraints,
            num_multiphase_constraints,
        })
    }
}
