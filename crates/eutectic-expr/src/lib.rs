//! Symbolic expressions compiled to fast numerical evaluators.
//!
//! This crate provides:
//! - A small algebraic expression tree with substitution and free-symbol
//!   queries
//! - Symbolic differentiation for gradients and Hessians
//! - Bytecode lowering to stack-machine evaluators that run without
//!   allocating on a caller-owned scratch stack
//! - A builder that fixes the positional argument convention
//!   (variables first, then parameters) used across a whole model set

pub mod builder;
pub mod compile;
pub mod diff;
pub mod error;
pub mod expr;

pub use builder::{BuildOptions, BuiltFunctions, CompiledGradient, CompiledHessian, build_functions};
pub use compile::{CompiledFunction, Instruction};
pub use error::{Error, Result};
pub use expr::{Expr, Symbol};
