//! Callable building: compile per-phase output and mass expressions into
//! an evaluator bundle.
//!
//! Phases are compiled in parallel; results are merged in request order so
//! that the first failure reported is deterministic.

use std::collections::BTreeSet;

use eutectic_expr::{
    build_functions, BuildOptions, CompiledFunction, CompiledGradient, CompiledHessian, Expr,
    Symbol,
};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::compile::types::{CallableOptions, Callables, CallablesBuild};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::model::{ModelMap, Property};
use crate::species::{pure_elements, Database};
use crate::vars::{ordered_variables, variable_symbols, StateVariable};

/// Everything compiled for a single phase, prior to merging into the
/// bundle.
struct PhaseArtifacts {
    phase: String,
    function: CompiledFunction,
    gradient: Option<CompiledGradient>,
    hessian: Option<CompiledHessian>,
    mass_functions: Vec<CompiledFunction>,
    mass_gradients: Option<Vec<CompiledGradient>>,
    mass_hessians: Option<Vec<CompiledHessian>>,
}

impl Callables {
    fn insert_phase(&mut self, artifacts: PhaseArtifacts) {
        let phase = artifacts.phase;
        if let Some(gradient) = artifacts.gradient {
            self.gradients.insert(phase.clone(), gradient);
        }
        if let Some(hessian) = artifacts.hessian {
            self.hessians.insert(phase.clone(), hessian);
        }
        if let Some(mass_gradients) = artifacts.mass_gradients {
            self.mass_gradients.insert(phase.clone(), mass_gradients);
        }
        if let Some(mass_hessians) = artifacts.mass_hessians {
            self.mass_hessians.insert(phase.clone(), mass_hessians);
        }
        self.mass_functions
            .insert(phase.clone(), artifacts.mass_functions);
        self.functions.insert(phase, artifacts.function);
    }
}

/// Compile the callables bundle for `output` over the requested phases.
///
/// Every evaluator takes its arguments in the order
/// `state_variables ++ site_fractions ++ parameters`, where the state
/// variables are sorted by string form, the site fractions follow each
/// model's declared order, and the parameters are the deduplicated,
/// canonically sorted form of `options.parameters`.
///
/// Free symbols of the output expression that are neither variables nor
/// declared parameters are substituted with zero before compilation; mass
/// expressions are compiled as-is.
pub fn build_callables(
    database: &Database,
    components: &[&str],
    phases: &[&str],
    models: &ModelMap,
    output: &str,
    options: &CallableOptions,
) -> Result<CallablesBuild> {
    let property: Property = output.parse()?;
    let parameters = normalize_parameters(&options.parameters);

    let species = database.resolve_components(components)?;
    let elements = pure_elements(&species);

    let mut diagnostics = Diagnostics::new();
    let state_variables = effective_state_variables(
        models,
        &options.additional_state_variables,
        &mut diagnostics,
    );

    let phase_names: Vec<String> = phases.iter().map(|p| p.to_uppercase()).collect();
    let results: Vec<Result<PhaseArtifacts>> = phase_names
        .par_iter()
        .map(|name| {
            compile_phase(
                name,
                models,
                property,
                &state_variables,
                &parameters,
                &elements,
                options,
            )
        })
        .collect();

    let mut callables = Callables::new(property, state_variables, parameters);
    for result in results {
        let artifacts = result?;
        debug!(phase = %artifacts.phase, output = %property, "compiled callables");
        diagnostics.push(Diagnostic::PhaseCompiled {
            phase: artifacts.phase.clone(),
        });
        callables.insert_phase(artifacts);
    }

    Ok(CallablesBuild {
        callables,
        diagnostics,
    })
}

/// Deduplicate and sort parameter symbols by their string form.
fn normalize_parameters(parameters: &[Symbol]) -> Vec<Symbol> {
    let unique: BTreeSet<&Symbol> = parameters.iter().collect();
    unique.into_iter().cloned().collect()
}

/// Union the state variables every model declares with the requested
/// extras, sorted by string form. Warns when the result is not the
/// conventional `{N, P, T}` set.
fn effective_state_variables(
    models: &ModelMap,
    additional: &[StateVariable],
    diagnostics: &mut Diagnostics,
) -> Vec<StateVariable> {
    let mut set: BTreeSet<StateVariable> = models
        .values()
        .flat_map(|model| model.state_variables().iter().cloned())
        .collect();
    set.extend(additional.iter().cloned());

    let conventional: BTreeSet<StateVariable> =
        StateVariable::conventional().into_iter().collect();
    if set != conventional {
        let found: Vec<StateVariable> = set.iter().cloned().collect();
        warn!(
            state_variables = ?found,
            "state variables do not match the conventional {{N, P, T}} set"
        );
        diagnostics.push(Diagnostic::NonConventionalStateVariables { found });
    }

    set.into_iter().collect()
}

fn compile_phase(
    phase: &str,
    models: &ModelMap,
    property: Property,
    state_variables: &[StateVariable],
    parameters: &[Symbol],
    elements: &[String],
    options: &CallableOptions,
) -> Result<PhaseArtifacts> {
    let model = models
        .get(phase)
        .ok_or_else(|| Error::MissingModel(phase.to_owned()))?;

    let variables = ordered_variables(state_variables, model.site_fractions());
    let variable_syms = variable_symbols(&variables);

    let expression = model.output_expression(property).ok_or_else(|| {
        Error::MissingProperty {
            phase: phase.to_owned(),
            property: property.name().to_owned(),
        }
    })?;
    let expression = zero_undefined_symbols(expression, phase, &variable_syms, parameters);

    let build = BuildOptions::with_derivatives(options.build_gradients, options.build_hessians);
    let compile_error = |source| Error::Compile {
        phase: phase.to_owned(),
        source,
    };

    let built = build_functions(&expression, &variable_syms, parameters, &build)
        .map_err(compile_error)?;
    let function = built.function.expect("base evaluator always requested");

    let mut mass_functions = Vec::with_capacity(elements.len());
    let mut mass_gradients = options
        .build_gradients
        .then(|| Vec::with_capacity(elements.len()));
    let mut mass_hessians = options
        .build_hessians
        .then(|| Vec::with_capacity(elements.len()));
    for element in elements {
        let moles = model.moles_of(element);
        let built =
            build_functions(&moles, &variable_syms, parameters, &build).map_err(compile_error)?;
        mass_functions.push(built.function.expect("base evaluator always requested"));
        if let Some(gradients) = mass_gradients.as_mut() {
            if let Some(gradient) = built.gradient {
                gradients.push(gradient);
            }
        }
        if let Some(hessians) = mass_hessians.as_mut() {
            if let Some(hessian) = built.hessian {
                hessians.push(hessian);
            }
        }
    }

    Ok(PhaseArtifacts {
        phase: phase.to_owned(),
        function,
        gradient: built.gradient,
        hessian: built.hessian,
        mass_functions,
        mass_gradients,
        mass_hessians,
    })
}

/// Substitute zero for free symbols of `expression` that are neither
/// ordered variables nor declared parameters.
fn zero_undefined_symbols(
    expression: &Expr,
    phase: &str,
    variables: &[Symbol],
    parameters: &[Symbol],
) -> Expr {
    let bound: FxHashSet<&Symbol> = variables.iter().chain(parameters.iter()).collect();
    let undefined: Vec<Symbol> = expression
        .free_symbols()
        .into_iter()
        .filter(|symbol| !bound.contains(symbol))
        .collect();
    if undefined.is_empty() {
        return expression.clone();
    }

    debug!(phase, symbols = ?undefined, "substituting zero for undefined symbols");
    let replacements: FxHashMap<Symbol, Expr> = undefined
        .into_iter()
        .map(|symbol| (symbol, Expr::ZERO))
        .collect();
    expression.substitute(&replacements)
}
