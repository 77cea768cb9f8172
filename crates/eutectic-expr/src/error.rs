//! Error types for eutectic-expr.

use thiserror::Error;

use crate::expr::Symbol;

/// Result type for eutectic-expr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling expressions.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A symbol in the expression is not bound to an argument slot.
    #[error("unbound symbol in expression: {0}")]
    UnboundSymbol(Symbol),

    /// The same symbol appears more than once in the argument list.
    #[error("duplicate argument symbol: {0}")]
    DuplicateArgument(Symbol),

    /// A numeric literal in the expression is not finite.
    #[error("non-finite constant in expression: {0}")]
    NonFiniteConstant(f64),

    /// An n-ary sum or product node has no operands.
    #[error("empty {0} node has no value")]
    EmptyOperands(&'static str),
}
