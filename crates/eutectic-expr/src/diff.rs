//! Symbolic differentiation.
//!
//! Derivatives rebuild through the smart constructors, so terms that do not
//! involve the differentiation variable collapse to zero instead of
//! accumulating dead branches. That keeps gradient and Hessian bytecode
//! close in size to a hand-derived form.

use crate::expr::{Expr, Symbol};

impl Expr {
    /// Partial derivative with respect to `var`.
    pub fn diff(&self, var: &Symbol) -> Expr {
        match self {
            Expr::Num(_) => Expr::ZERO,
            Expr::Sym(s) => {
                if s == var {
                    Expr::ONE
                } else {
                    Expr::ZERO
                }
            }
            Expr::Add(terms) => Expr::add(terms.iter().map(|t| t.diff(var)).collect()),
            Expr::Mul(factors) => {
                // Product rule over the n-ary form: sum_i f_i' * prod_{j != i} f_j.
                let mut terms = Vec::with_capacity(factors.len());
                for (i, factor) in factors.iter().enumerate() {
                    let d = factor.diff(var);
                    if d.is_zero() {
                        continue;
                    }
                    let mut parts = Vec::with_capacity(factors.len());
                    parts.push(d);
                    for (j, other) in factors.iter().enumerate() {
                        if j != i {
                            parts.push(other.clone());
                        }
                    }
                    terms.push(Expr::mul(parts));
                }
                Expr::add(terms)
            }
            Expr::Pow(base, exponent) => {
                let db = base.diff(var);
                let de = exponent.diff(var);
                match exponent.as_ref() {
                    // Power rule for constant exponents.
                    Expr::Num(n) => Expr::mul(vec![
                        Expr::Num(*n),
                        Expr::pow(base.as_ref().clone(), Expr::Num(n - 1.0)),
                        db,
                    ]),
                    _ if de.is_zero() => {
                        // Exponent is symbolic but constant w.r.t. `var`.
                        Expr::mul(vec![
                            exponent.as_ref().clone(),
                            Expr::pow(
                                base.as_ref().clone(),
                                exponent.as_ref().clone() - Expr::ONE,
                            ),
                            db,
                        ])
                    }
                    _ => {
                        // General case: d(b^e) = b^e * (e' ln b + e b'/b).
                        let value = Expr::pow(base.as_ref().clone(), exponent.as_ref().clone());
                        let inner = Expr::mul(vec![de, Expr::ln(base.as_ref().clone())])
                            + Expr::mul(vec![exponent.as_ref().clone(), db])
                                / base.as_ref().clone();
                        value * inner
                    }
                }
            }
            Expr::Ln(arg) => arg.diff(var) / arg.as_ref().clone(),
            Expr::Exp(arg) => Expr::mul(vec![arg.diff(var), self.clone()]),
        }
    }
}
