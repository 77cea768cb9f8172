//! Phase record assembly: combine compiled callables, constraint
//! evaluators, and resolved parameter values into the per-phase artifacts
//! the equilibrium solver consumes.

use std::collections::{BTreeMap, BTreeSet};

use eutectic_expr::Symbol;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compile::callables::build_callables;
use crate::compile::types::{
    CallableOptions, Callables, CallablesBuild, PhaseRecord, RecordOptions, RecordsBuild,
};
use crate::conditions::Conditions;
use crate::constraints::ConstraintBuilder;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::model::{ModelMap, Property};
use crate::species::Database;
use crate::vars::{ordered_variables, StateVariable};

/// Build one record per requested phase, compiling callables along the way.
///
/// The effective state-variable set is the union of what the models declare
/// and what the conditions fix, so callables, constraints, and records all
/// share one argument ordering. Records are keyed by uppercase phase name.
pub fn build_phase_records(
    database: &Database,
    components: &[&str],
    phases: &[&str],
    conditions: &Conditions,
    models: &ModelMap,
    output: &str,
    constraint_builder: &dyn ConstraintBuilder,
    options: &RecordOptions,
) -> Result<RecordsBuild> {
    let (parameter_symbols, parameter_values) = normalize_parameter_values(&options.parameters);

    // Compute the shared ordering once; handing the full set to the
    // callable builder guarantees callables and constraints agree on it.
    let state_variables = state_variable_set(models, conditions);
    let callable_options = CallableOptions {
        parameters: parameter_symbols.clone(),
        build_gradients: options.build_gradients,
        build_hessians: options.build_hessians,
        additional_state_variables: state_variables.clone(),
    };
    let CallablesBuild {
        callables,
        mut diagnostics,
    } = build_callables(
        database,
        components,
        phases,
        models,
        output,
        &callable_options,
    )?;

    let records = assemble(
        database,
        components,
        phases,
        conditions,
        models,
        constraint_builder,
        callables,
        &state_variables,
        parameter_symbols,
        parameter_values,
        &mut diagnostics,
    )?;
    Ok(RecordsBuild {
        records,
        diagnostics,
    })
}

/// Build records around a caller-supplied callables bundle.
///
/// The bundle is only checked for an output tag matching `output`; its
/// evaluators are otherwise trusted verbatim. In particular the argument
/// ordering the bundle was compiled against is never compared to the
/// ordering derived here from `models` and `conditions`, so a bundle built
/// over a different state-variable set yields records whose constraint
/// rows and evaluators silently disagree. Callers own that consistency.
/// Bundle entries are looked up by uppercase phase name.
pub fn build_phase_records_unchecked(
    callables: Callables,
    database: &Database,
    components: &[&str],
    phases: &[&str],
    conditions: &Conditions,
    models: &ModelMap,
    output: &str,
    constraint_builder: &dyn ConstraintBuilder,
    options: &RecordOptions,
) -> Result<RecordsBuild> {
    let property: Property = output.parse()?;
    if callables.output != property {
        return Err(Error::OutputMismatch {
            built: callables.output.name().to_owned(),
            requested: property.name().to_owned(),
        });
    }

    let (parameter_symbols, parameter_values) = normalize_parameter_values(&options.parameters);
    let state_variables = state_variable_set(models, conditions);

    let mut diagnostics = Diagnostics::new();
    let records = assemble(
        database,
        components,
        phases,
        conditions,
        models,
        constraint_builder,
        callables,
        &state_variables,
        parameter_symbols,
        parameter_values,
        &mut diagnostics,
    )?;
    Ok(RecordsBuild {
        records,
        diagnostics,
    })
}

/// Canonically order parameter overrides into parallel symbol and value
/// vectors, sorted by symbol string form.
fn normalize_parameter_values(parameters: &FxHashMap<Symbol, f64>) -> (Vec<Symbol>, Vec<f64>) {
    let sorted: BTreeMap<&Symbol, f64> = parameters.iter().map(|(s, v)| (s, *v)).collect();
    sorted.into_iter().map(|(s, v)| (s.clone(), v)).unzip()
}

/// Union of the models' declared state variables and those the conditions
/// fix, sorted by string form.
fn state_variable_set(models: &ModelMap, conditions: &Conditions) -> Vec<StateVariable> {
    let mut set: BTreeSet<StateVariable> = models
        .values()
        .flat_map(|model| model.state_variables().iter().cloned())
        .collect();
    set.extend(conditions.state_variables().cloned());
    set.into_iter().collect()
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    database: &Database,
    components: &[&str],
    phases: &[&str],
    conditions: &Conditions,
    models: &ModelMap,
    constraint_builder: &dyn ConstraintBuilder,
    mut callables: Callables,
    state_variables: &[StateVariable],
    parameter_symbols: Vec<Symbol>,
    parameter_values: Vec<f64>,
    diagnostics: &mut Diagnostics,
) -> Result<FxHashMap<String, PhaseRecord>> {
    let species = database.resolve_components(components)?;

    let mut records = FxHashMap::default();
    for phase in phases {
        let name = phase.to_uppercase();
        if records.contains_key(&name) {
            continue;
        }
        let model = models
            .get(&name)
            .ok_or_else(|| Error::MissingModel(name.clone()))?;

        let site_fractions = model.site_fractions().to_vec();
        let variables = ordered_variables(state_variables, &site_fractions);
        let constraints =
            constraint_builder.build(model.as_ref(), &variables, conditions, &parameter_symbols)?;

        let function = callables
            .functions
            .remove(&name)
            .ok_or_else(|| Error::MissingCallables(name.clone()))?;
        let mass_functions = callables
            .mass_functions
            .remove(&name)
            .ok_or_else(|| Error::MissingCallables(name.clone()))?;

        let record = PhaseRecord {
            components: species.clone(),
            state_variables: state_variables.to_vec(),
            site_fractions,
            parameters: parameter_symbols.clone(),
            parameter_values: parameter_values.clone(),
            function,
            gradient: callables.gradients.remove(&name),
            hessian: callables.hessians.remove(&name),
            mass_functions,
            mass_gradients: callables.mass_gradients.remove(&name),
            mass_hessians: callables.mass_hessians.remove(&name),
            constraints,
        };

        debug!(phase = %name, "assembled phase record");
        diagnostics.push(Diagnostic::PhaseAssembled { phase: name.clone() });
        records.insert(name, record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_values_sorted_by_symbol() {
        let mut parameters = FxHashMap::default();
        parameters.insert(Symbol::from("L1"), 50.0);
        parameters.insert(Symbol::from("GHSERZN"), -7285.787);
        parameters.insert(Symbol::from("L0"), 1250.0);
        let (symbols, values) = normalize_parameter_values(&parameters);
        assert_eq!(
            symbols,
            vec![
                Symbol::from("GHSERZN"),
                Symbol::from("L0"),
                Symbol::from("L1"),
            ]
        );
        assert_eq!(values, vec![-7285.787, 1250.0, 50.0]);
    }

    #[test]
    fn test_empty_overrides_yield_empty_vectors() {
        let (symbols, values) = normalize_parameter_values(&FxHashMap::default());
        assert!(symbols.is_empty());
        assert!(values.is_empty());
    }
}
