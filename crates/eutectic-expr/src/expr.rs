//! Symbolic expression tree.
//!
//! `Expr` is a small algebraic AST: numbers, symbols, n-ary sums and
//! products, powers, natural log and exp. That set covers sublattice
//! energy models (reference terms, `R*T*y*ln(y)` ideal mixing,
//! Redlich-Kister interaction polynomials) without pulling in a general
//! computer-algebra system.
//!
//! Construction goes through the smart constructors (`Expr::add`,
//! `Expr::mul`, `Expr::pow`, ...) or the operator overloads, which flatten
//! nested sums/products and fold constants. `Display` output is canonical
//! and deterministic, so rendered forms are usable as sort keys.

use std::collections::BTreeSet;
use std::fmt;
use std::ops;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A symbolic identifier, ordered by its string form. The name is held
/// behind a refcount, so clones share one backing string; serialization
/// stays a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(Arc::from(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol(Arc::from(name))
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(Arc::from(name))
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0.as_ref().to_owned()
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal.
    Num(f64),
    /// Free symbol.
    Sym(Symbol),
    /// N-ary sum.
    Add(Vec<Expr>),
    /// N-ary product.
    Mul(Vec<Expr>),
    /// `base ^ exponent`.
    Pow(Box<Expr>, Box<Expr>),
    /// Natural logarithm.
    Ln(Box<Expr>),
    /// Exponential.
    Exp(Box<Expr>),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn sym(name: impl Into<Symbol>) -> Self {
        Expr::Sym(name.into())
    }

    pub const ZERO: Expr = Expr::Num(0.0);
    pub const ONE: Expr = Expr::Num(1.0);

    /// Sum of `terms`, flattened, with constants folded and zeros dropped.
    pub fn add(terms: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(terms.len());
        let mut constant = 0.0;
        for term in terms {
            match term {
                Expr::Num(n) => constant += n,
                Expr::Add(inner) => {
                    for t in inner {
                        match t {
                            Expr::Num(n) => constant += n,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if constant != 0.0 {
            flat.push(Expr::Num(constant));
        }
        match flat.len() {
            0 => Expr::ZERO,
            1 => flat.pop().unwrap_or(Expr::ZERO),
            _ => Expr::Add(flat),
        }
    }

    /// Product of `factors`, flattened, with constants folded, ones dropped
    /// and zero short-circuited.
    pub fn mul(factors: Vec<Expr>) -> Self {
        let mut flat = Vec::with_capacity(factors.len());
        let mut constant = 1.0;
        for factor in factors {
            match factor {
                Expr::Num(n) => constant *= n,
                Expr::Mul(inner) => {
                    for x in inner {
                        match x {
                            Expr::Num(n) => constant *= n,
                            other => flat.push(other),
                        }
                    }
                }
                other => flat.push(other),
            }
        }
        if constant == 0.0 {
            return Expr::ZERO;
        }
        if constant != 1.0 {
            // Leading coefficient reads naturally and keeps negation cheap
            // to spot for the compiler.
            flat.insert(0, Expr::Num(constant));
        }
        match flat.len() {
            0 => Expr::ONE,
            1 => flat.pop().unwrap_or(Expr::ONE),
            _ => Expr::Mul(flat),
        }
    }

    /// `base ^ exponent`, with the trivial exponents folded away.
    pub fn pow(base: Expr, exponent: Expr) -> Self {
        match (&base, &exponent) {
            (_, Expr::Num(e)) if *e == 0.0 => Expr::ONE,
            (_, Expr::Num(e)) if *e == 1.0 => base,
            (Expr::Num(b), Expr::Num(e)) => {
                let v = b.powf(*e);
                if v.is_finite() {
                    Expr::Num(v)
                } else {
                    Expr::Pow(Box::new(base), Box::new(exponent))
                }
            }
            _ => Expr::Pow(Box::new(base), Box::new(exponent)),
        }
    }

    pub fn ln(arg: Expr) -> Self {
        Expr::Ln(Box::new(arg))
    }

    pub fn exp(arg: Expr) -> Self {
        Expr::Exp(Box::new(arg))
    }

    /// True if this expression is the literal zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(n) if *n == 0.0)
    }

    /// All symbols appearing free in the expression, deduplicated and
    /// ordered by name.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(s) => {
                out.insert(s.clone());
            }
            Expr::Add(terms) | Expr::Mul(terms) => {
                for t in terms {
                    t.collect_symbols(out);
                }
            }
            Expr::Pow(base, exponent) => {
                base.collect_symbols(out);
                exponent.collect_symbols(out);
            }
            Expr::Ln(arg) | Expr::Exp(arg) => arg.collect_symbols(out),
        }
    }

    /// Simultaneous replacement of symbols, rebuilding through the smart
    /// constructors so substituted constants fold.
    pub fn substitute(&self, replacements: &FxHashMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Num(_) => self.clone(),
            Expr::Sym(s) => replacements.get(s).cloned().unwrap_or_else(|| self.clone()),
            Expr::Add(terms) => {
                Expr::add(terms.iter().map(|t| t.substitute(replacements)).collect())
            }
            Expr::Mul(factors) => {
                Expr::mul(factors.iter().map(|x| x.substitute(replacements)).collect())
            }
            Expr::Pow(base, exponent) => Expr::pow(
                base.substitute(replacements),
                exponent.substitute(replacements),
            ),
            Expr::Ln(arg) => Expr::ln(arg.substitute(replacements)),
            Expr::Exp(arg) => Expr::exp(arg.substitute(replacements)),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_) => 1,
            Expr::Mul(_) => 2,
            Expr::Pow(..) => 3,
            _ => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        if self.precedence() < min_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Add(terms) => {
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    t.fmt_child(f, 2)?;
                }
                Ok(())
            }
            Expr::Mul(factors) => {
                for (i, x) in factors.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    x.fmt_child(f, 3)?;
                }
                Ok(())
            }
            Expr::Pow(base, exponent) => {
                base.fmt_child(f, 4)?;
                f.write_str("^")?;
                exponent.fmt_child(f, 4)
            }
            Expr::Ln(arg) => write!(f, "ln({arg})"),
            Expr::Exp(arg) => write!(f, "exp({arg})"),
        }
    }
}

impl ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add(vec![self, rhs])
    }
}

impl ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::add(vec![self, -rhs])
    }
}

impl ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(vec![self, rhs])
    }
}

impl ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::mul(vec![self, Expr::pow(rhs, Expr::Num(-1.0))])
    }
}

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::mul(vec![Expr::Num(-1.0), self])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::sym("x")
    }

    fn y() -> Expr {
        Expr::sym("y")
    }

    #[test]
    fn test_add_folds_constants_and_flattens() {
        let e = Expr::add(vec![
            Expr::Num(1.0),
            Expr::add(vec![x(), Expr::Num(2.0)]),
            Expr::Num(3.0),
        ]);
        assert_eq!(e, Expr::Add(vec![x(), Expr::Num(6.0)]));
    }

    #[test]
    fn test_add_of_nothing_is_zero() {
        assert_eq!(Expr::add(vec![]), Expr::ZERO);
        assert_eq!(Expr::add(vec![Expr::Num(2.0), Expr::Num(-2.0)]), Expr::ZERO);
    }

    #[test]
    fn test_mul_short_circuits_on_zero() {
        let e = Expr::mul(vec![x(), Expr::ZERO, y()]);
        assert!(e.is_zero());
    }

    #[test]
    fn test_mul_drops_unit_coefficient() {
        let e = Expr::mul(vec![Expr::Num(1.0), x()]);
        assert_eq!(e, x());
    }

    #[test]
    fn test_pow_folds_trivial_exponents() {
        assert_eq!(Expr::pow(x(), Expr::Num(1.0)), x());
        assert_eq!(Expr::pow(x(), Expr::Num(0.0)), Expr::ONE);
        assert_eq!(Expr::pow(Expr::Num(2.0), Expr::Num(3.0)), Expr::Num(8.0));
    }

    #[test]
    fn test_symbol_clones_share_backing_storage() {
        let a = Symbol::from("Y(LIQUID,0,AL)");
        let b = a.clone();
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.name(), b.name()));
    }

    #[test]
    fn test_free_symbols_sorted_and_deduplicated() {
        let e = y() * x() + Expr::ln(x()) + Expr::Num(4.0);
        let syms: Vec<String> = e.free_symbols().iter().map(|s| s.to_string()).collect();
        assert_eq!(syms, vec!["x", "y"]);
    }

    #[test]
    fn test_substitute_is_simultaneous() {
        // x -> y, y -> x must swap, not chain.
        let mut map = FxHashMap::default();
        map.insert(Symbol::from("x"), y());
        map.insert(Symbol::from("y"), x());
        let e = x() - y();
        let swapped = e.substitute(&map);
        assert_eq!(swapped, y() - x());
    }

    #[test]
    fn test_substitute_folds_constants() {
        let mut map = FxHashMap::default();
        map.insert(Symbol::from("x"), Expr::Num(0.0));
        let e = x() * y() + Expr::Num(5.0);
        assert_eq!(e.substitute(&map), Expr::Num(5.0));
    }

    #[test]
    fn test_display_is_parenthesized_canonically() {
        let e = (x() + y()) * Expr::Num(2.0);
        assert_eq!(e.to_string(), "2*(x + y)");
        let p = Expr::pow(x() + y(), Expr::Num(2.0));
        assert_eq!(p.to_string(), "(x + y)^2");
    }

    #[test]
    fn test_display_deterministic_for_equal_builds() {
        let a = x() * y() + Expr::ln(x());
        let b = x() * y() + Expr::ln(x());
        assert_eq!(a.to_string(), b.to_string());
    }
}
