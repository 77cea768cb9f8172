//! End-to-end compilation of a two-constituent Gibbs-energy expression.

use approx::assert_relative_eq;
use eutectic_expr::{BuildOptions, Expr, Symbol, build_functions};

const R: f64 = 8.314462618;

/// G = y0*G0 + y1*G1 + R*T*(y0 ln y0 + y1 ln y1) + L*y0*y1
fn two_site_gibbs(g0: f64, g1: f64) -> Expr {
    let t = Expr::sym("T");
    let y0 = Expr::sym("y0");
    let y1 = Expr::sym("y1");
    let ideal = Expr::Num(R)
        * t
        * (y0.clone() * Expr::ln(y0.clone()) + y1.clone() * Expr::ln(y1.clone()));
    let excess = Expr::sym("L") * y0.clone() * y1.clone();
    y0 * Expr::Num(g0) + y1 * Expr::Num(g1) + ideal + excess
}

#[test]
fn test_value_and_gradient_match_closed_form() {
    let expr = two_site_gibbs(-10_000.0, -12_000.0);
    let variables: Vec<Symbol> = ["T", "y0", "y1"].map(Symbol::from).to_vec();
    let parameters = vec![Symbol::from("L")];

    let built = build_functions(
        &expr,
        &variables,
        &parameters,
        &BuildOptions::with_derivatives(true, true),
    )
    .expect("expression compiles");

    let (t, y0, y1, l) = (1000.0_f64, 0.4_f64, 0.6_f64, 5000.0_f64);
    let args = [t, y0, y1, l];

    let expected = y0 * -10_000.0
        + y1 * -12_000.0
        + R * t * (y0 * y0.ln() + y1 * y1.ln())
        + l * y0 * y1;
    let f = built.function.expect("base requested");
    assert_relative_eq!(f.evaluate(&args), expected, max_relative = 1e-12);

    let grad = built.gradient.expect("gradient requested");
    let mut g = [0.0; 3];
    grad.evaluate(&args, &mut g);
    assert_relative_eq!(g[0], R * (y0 * y0.ln() + y1 * y1.ln()), max_relative = 1e-12);
    assert_relative_eq!(g[1], -10_000.0 + R * t * (y0.ln() + 1.0) + l * y1, max_relative = 1e-12);
    assert_relative_eq!(g[2], -12_000.0 + R * t * (y1.ln() + 1.0) + l * y0, max_relative = 1e-12);
}

#[test]
fn test_hessian_mixing_curvature() {
    let expr = two_site_gibbs(0.0, 0.0);
    let variables: Vec<Symbol> = ["T", "y0", "y1"].map(Symbol::from).to_vec();
    let parameters = vec![Symbol::from("L")];

    let built = build_functions(
        &expr,
        &variables,
        &parameters,
        &BuildOptions::with_derivatives(false, true),
    )
    .expect("expression compiles");

    let hess = built.hessian.expect("hessian requested");
    let (t, y0, y1, l) = (800.0_f64, 0.25_f64, 0.75_f64, 2000.0_f64);
    let mut h = [0.0; 9];
    hess.evaluate(&[t, y0, y1, l], &mut h);

    // d2G/dy0^2 = R*T/y0, d2G/dy0 dy1 = L, d2G/dT dy0 = R*(ln y0 + 1).
    assert_relative_eq!(h[4], R * t / y0, max_relative = 1e-12);
    assert_relative_eq!(h[5], l, max_relative = 1e-12);
    assert_relative_eq!(h[1], R * (y0.ln() + 1.0), max_relative = 1e-12);
    // Symmetry.
    assert_relative_eq!(h[3], h[1], max_relative = 1e-12);
    assert_relative_eq!(h[7], h[5], max_relative = 1e-12);
}

#[test]
fn test_parameter_value_changes_without_recompiling() {
    let expr = two_site_gibbs(0.0, 0.0);
    let variables: Vec<Symbol> = ["T", "y0", "y1"].map(Symbol::from).to_vec();
    let parameters = vec![Symbol::from("L")];

    let built =
        build_functions(&expr, &variables, &parameters, &BuildOptions::default()).expect("compiles");
    let f = built.function.expect("base requested");

    let lo = f.evaluate(&[500.0, 0.5, 0.5, 0.0]);
    let hi = f.evaluate(&[500.0, 0.5, 0.5, 4000.0]);
    assert_relative_eq!(hi - lo, 4000.0 * 0.25, max_relative = 1e-12);
}
