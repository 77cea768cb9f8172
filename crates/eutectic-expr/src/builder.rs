//! Build function/gradient/Hessian evaluator triples from one expression.
//!
//! [`build_functions`] is the boundary the compilation pipeline programs
//! against: it fixes the positional argument convention (`variables` first,
//! then `parameters`) and derives gradient and Hessian bytecode by symbolic
//! differentiation with respect to the variables only. Parameters are
//! carried as trailing arguments so their values can change between
//! evaluations without recompiling.

use serde::{Deserialize, Serialize};

use crate::compile::CompiledFunction;
use crate::error::Result;
use crate::expr::{Expr, Symbol};

/// Which artifacts [`build_functions`] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Build the base-value evaluator. Off only when a caller wants
    /// derivatives for an expression whose value it already has compiled.
    pub include_base: bool,
    /// Build the first-derivative evaluators.
    pub include_gradient: bool,
    /// Build the second-derivative evaluators.
    pub include_hessian: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            include_base: true,
            include_gradient: false,
            include_hessian: false,
        }
    }
}

impl BuildOptions {
    /// Base value plus the requested derivative orders.
    pub fn with_derivatives(gradient: bool, hessian: bool) -> Self {
        BuildOptions {
            include_base: true,
            include_gradient: gradient,
            include_hessian: hessian,
        }
    }
}

/// First derivatives of a compiled expression, one evaluator per variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledGradient {
    components: Vec<CompiledFunction>,
}

impl CompiledGradient {
    /// Number of variables differentiated against.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Scratch slots sufficient for every component.
    pub fn stack_size(&self) -> usize {
        self.components
            .iter()
            .map(CompiledFunction::stack_size)
            .max()
            .unwrap_or(0)
    }

    /// Evaluate all components into `out` (`out.len() == self.len()`).
    ///
    /// Allocates one scratch stack shared across the components; see
    /// [`evaluate_with`](Self::evaluate_with) to reuse a buffer instead.
    pub fn evaluate(&self, args: &[f64], out: &mut [f64]) {
        let mut stack = vec![0.0_f64; self.stack_size()];
        self.evaluate_with(args, out, &mut stack);
    }

    /// As [`evaluate`](Self::evaluate), on a caller-owned scratch stack of
    /// at least [`stack_size`](Self::stack_size) slots.
    pub fn evaluate_with(&self, args: &[f64], out: &mut [f64], stack: &mut [f64]) {
        debug_assert_eq!(out.len(), self.components.len(), "gradient buffer size");
        for (slot, component) in out.iter_mut().zip(&self.components) {
            *slot = component.evaluate_with(args, stack);
        }
    }
}

/// Second derivatives of a compiled expression.
///
/// Only the lower triangle is compiled; evaluation mirrors it into a dense
/// row-major `n x n` buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledHessian {
    /// Lower triangle, row-major: entry `(i, j)` with `j <= i` lives at
    /// `i * (i + 1) / 2 + j`.
    components: Vec<CompiledFunction>,
    n_vars: usize,
}

impl CompiledHessian {
    /// Number of variables differentiated against.
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Scratch slots sufficient for every component.
    pub fn stack_size(&self) -> usize {
        self.components
            .iter()
            .map(CompiledFunction::stack_size)
            .max()
            .unwrap_or(0)
    }

    /// Evaluate into a dense row-major buffer of `n_vars * n_vars` entries.
    ///
    /// Allocates one scratch stack shared across the components; see
    /// [`evaluate_with`](Self::evaluate_with) to reuse a buffer instead.
    pub fn evaluate(&self, args: &[f64], out: &mut [f64]) {
        let mut stack = vec![0.0_f64; self.stack_size()];
        self.evaluate_with(args, out, &mut stack);
    }

    /// As [`evaluate`](Self::evaluate), on a caller-owned scratch stack of
    /// at least [`stack_size`](Self::stack_size) slots.
    pub fn evaluate_with(&self, args: &[f64], out: &mut [f64], stack: &mut [f64]) {
        let n = self.n_vars;
        debug_assert_eq!(out.len(), n * n, "hessian buffer size");
        for i in 0..n {
            for j in 0..=i {
                let value = self.components[i * (i + 1) / 2 + j].evaluate_with(args, stack);
                out[i * n + j] = value;
                out[j * n + i] = value;
            }
        }
    }
}

/// The artifacts produced for one expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltFunctions {
    /// Base-value evaluator, absent when `include_base` was off.
    pub function: Option<CompiledFunction>,
    /// Gradient evaluators, absent when `include_gradient` was off.
    pub gradient: Option<CompiledGradient>,
    /// Hessian evaluators, absent when `include_hessian` was off.
    pub hessian: Option<CompiledHessian>,
}

/// Compile `expr` into evaluators whose positional argument order is exactly
/// `variables ++ parameters`.
///
/// Derivatives are taken with respect to `variables` only. Every free symbol
/// of `expr` must be bound by one of the two lists.
pub fn build_functions(
    expr: &Expr,
    variables: &[Symbol],
    parameters: &[Symbol],
    options: &BuildOptions,
) -> Result<BuiltFunctions> {
    let mut args: Vec<Symbol> = Vec::with_capacity(variables.len() + parameters.len());
    args.extend_from_slice(variables);
    args.extend_from_slice(parameters);

    let function = if options.include_base {
        Some(CompiledFunction::compile(expr, &args)?)
    } else {
        None
    };

    let mut first_derivatives = Vec::new();
    if options.include_gradient || options.include_hessian {
        first_derivatives = variables.iter().map(|v| expr.diff(v)).collect();
    }

    let gradient = if options.include_gradient {
        let components = first_derivatives
            .iter()
            .map(|d| CompiledFunction::compile(d, &args))
            .collect::<Result<Vec<_>>>()?;
        Some(CompiledGradient { components })
    } else {
        None
    };

    let hessian = if options.include_hessian {
        let mut components = Vec::with_capacity(variables.len() * (variables.len() + 1) / 2);
        for (i, di) in first_derivatives.iter().enumerate() {
            for vj in &variables[..=i] {
                let dij = di.diff(vj);
                components.push(CompiledFunction::compile(&dij, &args)?);
            }
        }
        Some(CompiledHessian {
            components,
            n_vars: variables.len(),
        })
    } else {
        None
    };

    Ok(BuiltFunctions {
        function,
        gradient,
        hessian,
    })
}
