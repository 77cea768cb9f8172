//! Integration tests for callable building over a binary Al-Zn system.
//!
//! The fixtures model a liquid solution phase and an fcc phase with a
//! vacancy interstitial sublattice, with Gibbs energies of the usual
//! ideal-plus-excess form.

use approx::assert_relative_eq;
use eutectic_core::{
    build_callables, model_map, CallableOptions, Callables, Conditions, Database, Diagnostic,
    Error, ModelMap, PhaseModel, Property, SiteFraction, Species, StateVariable, Sublattice,
    SublatticeModel, Variable,
};
use eutectic_expr::{Expr, Symbol};

const R: f64 = 8.314462618;

fn make_database() -> Database {
    Database::new()
        .with_species(Species::pure("AL"))
        .with_species(Species::pure("ZN"))
        .with_species(Species::vacancy())
}

/// `GM = yAl*GHSERAL + yZn*GHSERZN + R*T*(y ln y) + L0*yAl*yZn` over one
/// substitutional sublattice.
fn liquid_model() -> SublatticeModel {
    let model = SublatticeModel::new(
        "LIQUID",
        vec![Sublattice::new(
            1.0,
            vec![Species::pure("AL"), Species::pure("ZN")],
        )],
    );
    let t = Expr::Sym(StateVariable::temperature().symbol());
    let ya = Expr::Sym(model.site_fraction(0, "AL").symbol());
    let yb = Expr::Sym(model.site_fraction(0, "ZN").symbol());
    let ideal = ya.clone() * Expr::ln(ya.clone()) + yb.clone() * Expr::ln(yb.clone());
    let gm = ya.clone() * Expr::sym("GHSERAL")
        + yb.clone() * Expr::sym("GHSERZN")
        + Expr::num(R) * t * ideal
        + Expr::sym("L0") * ya * yb;
    model.with_property(Property::GibbsEnergy, gm)
}

/// Two sublattices, `(Al,Zn)1 (Va)3`, so the vacancy contributes a site
/// fraction but no mass.
fn fcc_model() -> SublatticeModel {
    let model = SublatticeModel::new(
        "FCC_A1",
        vec![
            Sublattice::new(1.0, vec![Species::pure("AL"), Species::pure("ZN")]),
            Sublattice::new(3.0, vec![Species::vacancy()]),
        ],
    );
    let t = Expr::Sym(StateVariable::temperature().symbol());
    let ya = Expr::Sym(model.site_fraction(0, "AL").symbol());
    let yb = Expr::Sym(model.site_fraction(0, "ZN").symbol());
    let ideal = ya.clone() * Expr::ln(ya.clone()) + yb.clone() * Expr::ln(yb.clone());
    let gm = Expr::num(-7976.15) * ya + Expr::num(-4315.967) * yb + Expr::num(R) * t * ideal;
    model.with_property(Property::GibbsEnergy, gm)
}

fn make_models() -> ModelMap {
    model_map([liquid_model(), fcc_model()])
}

/// All three interaction coefficients free, plus `N` so the state-variable
/// set is the conventional one.
fn conventional_options() -> CallableOptions {
    CallableOptions::default()
        .with_state_variable(StateVariable::moles())
        .with_parameter("GHSERAL")
        .with_parameter("GHSERZN")
        .with_parameter("L0")
}

fn liquid_gm(t: f64, ya: f64, yb: f64, ga: f64, gb: f64, l0: f64) -> f64 {
    ya * ga + yb * gb + R * t * (ya * ya.ln() + yb * yb.ln()) + l0 * ya * yb
}

// Argument order for LIQUID under conventional_options:
// [N, P, T, Y(LIQUID,0,AL), Y(LIQUID,0,ZN), GHSERAL, GHSERZN, L0]
const LIQUID_ARGS: [f64; 8] = [
    1.0, 101325.0, 600.0, 0.4, 0.6, -11276.24, -7285.787, 1250.0,
];

#[test]
fn test_callables_cover_each_requested_phase() {
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["liquid", "fcc_a1"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    let callables = &build.callables;
    assert_eq!(callables.output, Property::GibbsEnergy);
    assert_eq!(callables.functions.len(), 2);
    assert!(callables.functions.contains_key("LIQUID"));
    assert!(callables.functions.contains_key("FCC_A1"));
}

#[test]
fn test_argument_ordering_and_value() {
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    let callables = &build.callables;

    assert_eq!(
        callables.state_variables,
        vec![
            StateVariable::moles(),
            StateVariable::pressure(),
            StateVariable::temperature(),
        ]
    );
    assert_eq!(
        callables.parameters,
        vec![
            Symbol::from("GHSERAL"),
            Symbol::from("GHSERZN"),
            Symbol::from("L0"),
        ]
    );

    let function = &callables.functions["LIQUID"];
    assert_eq!(function.arity(), 8);
    assert_relative_eq!(
        function.evaluate(&LIQUID_ARGS),
        liquid_gm(600.0, 0.4, 0.6, -11276.24, -7285.787, 1250.0),
        max_relative = 1e-12
    );
}

#[test]
fn test_parameter_declaration_order_is_irrelevant() {
    let reversed = CallableOptions::default()
        .with_state_variable(StateVariable::moles())
        .with_parameter("L0")
        .with_parameter("GHSERZN")
        .with_parameter("GHSERAL")
        .with_parameter("L0");
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &reversed,
    )
    .unwrap();
    assert_eq!(
        build.callables.parameters,
        vec![
            Symbol::from("GHSERAL"),
            Symbol::from("GHSERZN"),
            Symbol::from("L0"),
        ]
    );
    let value = build.callables.functions["LIQUID"].evaluate(&LIQUID_ARGS);
    assert_relative_eq!(
        value,
        liquid_gm(600.0, 0.4, 0.6, -11276.24, -7285.787, 1250.0),
        max_relative = 1e-12
    );
}

#[test]
fn test_undeclared_symbols_are_zeroed() {
    // GHSERAL and GHSERZN are not declared as parameters here, so the
    // energy reduces to the ideal and excess terms.
    let options = CallableOptions::default()
        .with_state_variable(StateVariable::moles())
        .with_parameter("L0");
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &options,
    )
    .unwrap();
    let function = &build.callables.functions["LIQUID"];
    assert_eq!(function.arity(), 6);
    let args = [1.0, 101325.0, 600.0, 0.4, 0.6, 1250.0];
    assert_relative_eq!(
        function.evaluate(&args),
        liquid_gm(600.0, 0.4, 0.6, 0.0, 0.0, 1250.0),
        max_relative = 1e-12
    );
}

/// Mass expressions are compiled as-is, so an undefined symbol in one is a
/// compile error rather than being silently zeroed.
#[test]
fn test_mass_expressions_are_not_zero_substituted() {
    struct MysteryMass(SublatticeModel);

    impl PhaseModel for MysteryMass {
        fn phase_name(&self) -> &str {
            self.0.phase_name()
        }
        fn state_variables(&self) -> &[StateVariable] {
            self.0.state_variables()
        }
        fn site_fractions(&self) -> &[SiteFraction] {
            self.0.site_fractions()
        }
        fn output_expression(&self, property: Property) -> Option<&Expr> {
            self.0.output_expression(property)
        }
        fn moles_of(&self, _element: &str) -> Expr {
            Expr::sym("MYSTERY")
        }
    }

    let models = model_map([MysteryMass(liquid_model())]);
    let result = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &models,
        "GM",
        &conventional_options(),
    );
    assert!(matches!(result, Err(Error::Compile { phase, .. }) if phase == "LIQUID"));
}

#[test]
fn test_gradient_values() {
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    let gradient = &build.callables.gradients["LIQUID"];
    assert_eq!(gradient.len(), 5);

    let mut out = [0.0; 5];
    gradient.evaluate(&LIQUID_ARGS, &mut out);

    let (t, ya, yb) = (600.0_f64, 0.4_f64, 0.6_f64);
    let (ga, gb, l0) = (-11276.24, -7285.787, 1250.0);
    // The energy does not reference N or P.
    assert_eq!(out[0], 0.0);
    assert_eq!(out[1], 0.0);
    assert_relative_eq!(
        out[2],
        R * (ya * ya.ln() + yb * yb.ln()),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        out[3],
        ga + R * t * (ya.ln() + 1.0) + l0 * yb,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        out[4],
        gb + R * t * (yb.ln() + 1.0) + l0 * ya,
        max_relative = 1e-12
    );
}

#[test]
fn test_hessian_values_and_symmetry() {
    let options = CallableOptions {
        build_hessians: true,
        ..conventional_options()
    };
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &options,
    )
    .unwrap();
    let hessian = &build.callables.hessians["LIQUID"];

    let n = 5;
    let mut out = vec![0.0; n * n];
    hessian.evaluate(&LIQUID_ARGS, &mut out);

    let (t, ya) = (600.0, 0.4);
    // d2G/dyAl2 = R*T/yAl
    assert_relative_eq!(out[3 * n + 3], R * t / ya, max_relative = 1e-12);
    // d2G/dT dyAl = R*(ln yAl + 1), mirrored across the diagonal
    assert_relative_eq!(out[2 * n + 3], R * (ya.ln() + 1.0), max_relative = 1e-12);
    assert_eq!(out[2 * n + 3], out[3 * n + 2]);
    // d2G/dyAl dyZn = L0
    assert_relative_eq!(out[3 * n + 4], 1250.0, max_relative = 1e-12);
}

#[test]
fn test_derivative_build_flags() {
    let database = make_database();
    let models = make_models();
    let components = ["AL", "ZN", "VA"];
    let phases = ["LIQUID", "FCC_A1"];

    let default_build = build_callables(
        &database,
        &components,
        &phases,
        &models,
        "GM",
        &conventional_options(),
    )
    .unwrap();
    assert_eq!(default_build.callables.gradients.len(), 2);
    assert!(default_build.callables.hessians.is_empty());
    assert_eq!(default_build.callables.mass_gradients.len(), 2);

    let values_only = CallableOptions {
        build_gradients: false,
        ..conventional_options()
    };
    let build = build_callables(
        &database,
        &components,
        &phases,
        &models,
        "GM",
        &values_only,
    )
    .unwrap();
    assert!(build.callables.gradients.is_empty());
    assert!(build.callables.mass_gradients.is_empty());
    assert_eq!(build.callables.functions.len(), 2);
}

#[test]
fn test_mass_callables_one_per_element() {
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID", "FCC_A1"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    let callables = &build.callables;

    // Two pure elements: the vacancy never gets a mass entry.
    assert_eq!(callables.mass_functions["LIQUID"].len(), 2);
    assert_eq!(callables.mass_functions["FCC_A1"].len(), 2);

    // LIQUID: moles(Al) = yAl at this point, since the sublattice sums to 1.
    let liquid_al = &callables.mass_functions["LIQUID"][0];
    assert_relative_eq!(
        liquid_al.evaluate(&LIQUID_ARGS),
        0.4,
        max_relative = 1e-12
    );

    // FCC args: [N, P, T, yAl, yZn, yVa, GHSERAL, GHSERZN, L0]; the
    // vacancy sublattice carries no atoms, so it cancels from the mass.
    let fcc_args = [1.0, 101325.0, 600.0, 0.7, 0.3, 1.0, 0.0, 0.0, 0.0];
    let fcc_al = &callables.mass_functions["FCC_A1"][0];
    let fcc_zn = &callables.mass_functions["FCC_A1"][1];
    assert_eq!(fcc_al.arity(), 9);
    assert_relative_eq!(
        fcc_al.evaluate(&fcc_args),
        0.7 / (0.7 + 0.3),
        max_relative = 1e-12
    );
    assert_relative_eq!(
        fcc_zn.evaluate(&fcc_args),
        0.3 / (0.7 + 0.3),
        max_relative = 1e-12
    );
}

#[test]
fn test_nonconventional_state_variables_warn() {
    // No N anywhere: the models declare {P, T} only.
    let options = CallableOptions::default()
        .with_parameter("GHSERAL")
        .with_parameter("GHSERZN")
        .with_parameter("L0");
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &options,
    )
    .unwrap();
    assert_eq!(
        build.callables.state_variables,
        vec![StateVariable::pressure(), StateVariable::temperature()]
    );
    let warnings: Vec<_> = build.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        warnings[0],
        Diagnostic::NonConventionalStateVariables { .. }
    ));

    // Adding N via options restores the conventional set; no warning.
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    assert_eq!(build.diagnostics.warnings().count(), 0);
}

#[test]
fn test_missing_property_reports_first_phase_in_request_order() {
    let result = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID", "FCC_A1"],
        &make_models(),
        "HM",
        &conventional_options(),
    );
    match result {
        Err(Error::MissingProperty { phase, property }) => {
            assert_eq!(phase, "LIQUID");
            assert_eq!(property, "HM");
        }
        other => panic!("expected MissingProperty, got {other:?}"),
    }
}

#[test]
fn test_unknown_component_is_fatal() {
    let result = build_callables(
        &make_database(),
        &["AL", "XX"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &conventional_options(),
    );
    assert!(matches!(result, Err(Error::UnknownComponent(name)) if name == "XX"));
}

/// Bundles survive serialization, so one process can compile and another
/// can assemble records from the result.
#[test]
fn test_callables_round_trip_through_json() {
    let build = build_callables(
        &make_database(),
        &["AL", "ZN", "VA"],
        &["LIQUID"],
        &make_models(),
        "GM",
        &conventional_options(),
    )
    .unwrap();
    let json = serde_json::to_string(&build.callables).unwrap();
    let back: Callables = serde_json::from_str(&json).unwrap();

    assert_eq!(back.output, build.callables.output);
    assert_eq!(back.state_variables, build.callables.state_variables);
    assert_eq!(back.parameters, build.callables.parameters);
    assert_eq!(
        back.functions["LIQUID"].evaluate(&LIQUID_ARGS),
        build.callables.functions["LIQUID"].evaluate(&LIQUID_ARGS)
    );
}

#[test]
fn test_rebuild_is_deterministic() {
    let database = make_database();
    let models = make_models();
    let components = ["AL", "ZN", "VA"];
    let phases = ["LIQUID", "FCC_A1"];
    let options = conventional_options();

    let first = build_callables(&database, &components, &phases, &models, "GM", &options).unwrap();
    let second = build_callables(&database, &components, &phases, &models, "GM", &options).unwrap();
    let a = first.callables.functions["LIQUID"].evaluate(&LIQUID_ARGS);
    let b = second.callables.functions["LIQUID"].evaluate(&LIQUID_ARGS);
    assert_eq!(a, b);
}

#[test]
fn test_ordered_variables_interleave_state_variables_and_site_fractions() {
    let model = liquid_model();
    let state_variables = [
        StateVariable::moles(),
        StateVariable::pressure(),
        StateVariable::temperature(),
    ];
    let variables =
        eutectic_core::ordered_variables(&state_variables, model.site_fractions());
    assert_eq!(variables.len(), 5);
    assert!(matches!(variables[0], Variable::State(_)));
    assert!(matches!(variables[3], Variable::SiteFraction(_)));
    let symbols = eutectic_core::variable_symbols(&variables);
    assert_eq!(symbols[2], Symbol::from("T"));
    assert_eq!(symbols[3], Symbol::from("Y(LIQUID,0,AL)"));
}

#[test]
fn test_conditions_contribute_state_variables() {
    // Conditions are consumed by record assembly, but their state-variable
    // view drives the shared ordering; check the accessor shape here.
    let conditions = Conditions::new()
        .with_state_variable(StateVariable::moles(), 1.0)
        .with_state_variable(StateVariable::temperature(), 600.0)
        .with_mole_fraction("ZN", 0.4);
    let from_conditions: Vec<_> = conditions.state_variables().cloned().collect();
    assert_eq!(
        from_conditions,
        vec![StateVariable::moles(), StateVariable::temperature()]
    );
}
