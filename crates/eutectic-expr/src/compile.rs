//! Bytecode compilation of expressions to stack-machine evaluators.
//!
//! An `Expr` is lowered once into a flat instruction sequence; evaluation
//! then runs a fixed-size value stack with no branching beyond the
//! instruction dispatch. The maximum stack depth is computed at compile
//! time, so callers on a hot path can hand
//! [`CompiledFunction::evaluate_with`] a preallocated scratch stack and
//! evaluate without allocating; [`CompiledFunction::evaluate`] allocates
//! its own scratch per call.
//!
//! Arguments are positional: `Load(i)` reads slot `i` of the argument slice
//! passed to [`CompiledFunction::evaluate`]. Binding symbols to slots is the
//! caller's job (see `builder`), which is what makes argument ordering a
//! compile-time contract rather than a runtime lookup.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::{Expr, Symbol};

/// One stack-machine operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Push a constant.
    Const(f64),
    /// Push argument slot `i`.
    Load(usize),
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Pow,
    Ln,
    Exp,
}

/// A compiled scalar function of `arity` positional arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledFunction {
    instructions: Vec<Instruction>,
    stack_size: usize,
    arity: usize,
}

impl CompiledFunction {
    /// Lower `expr` against the positional argument list `args`.
    ///
    /// Every free symbol of `expr` must appear in `args`; `args` must not
    /// contain duplicates.
    pub fn compile(expr: &Expr, args: &[Symbol]) -> Result<Self> {
        let mut slots = FxHashMap::default();
        for (i, sym) in args.iter().enumerate() {
            if slots.insert(sym.clone(), i).is_some() {
                return Err(Error::DuplicateArgument(sym.clone()));
            }
        }
        let mut lowering = Lowering {
            slots: &slots,
            instructions: Vec::new(),
            depth: 0,
            max_depth: 0,
        };
        lowering.emit(expr)?;
        Ok(CompiledFunction {
            instructions: lowering.instructions,
            stack_size: lowering.max_depth.max(1),
            arity: args.len(),
        })
    }

    /// Number of positional arguments the function expects.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of lowered instructions. Useful for asserting that a build
    /// produced the artifact shape you expect.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Scratch slots [`evaluate_with`](Self::evaluate_with) needs.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Evaluate with `args.len() == self.arity()`.
    ///
    /// Allocates a fresh scratch stack per call; hot loops should hold one
    /// buffer and use [`evaluate_with`](Self::evaluate_with) instead.
    pub fn evaluate(&self, args: &[f64]) -> f64 {
        let mut stack = vec![0.0_f64; self.stack_size];
        self.evaluate_with(args, &mut stack)
    }

    /// Evaluate on a caller-owned scratch stack of at least
    /// [`stack_size`](Self::stack_size) slots. Performs no allocation; the
    /// buffer's prior contents do not matter.
    pub fn evaluate_with(&self, args: &[f64], stack: &mut [f64]) -> f64 {
        debug_assert_eq!(args.len(), self.arity, "argument count mismatch");
        debug_assert!(stack.len() >= self.stack_size, "scratch stack too small");
        let mut sp = 0_usize;
        for instr in &self.instructions {
            match *instr {
                Instruction::Const(v) => {
                    stack[sp] = v;
                    sp += 1;
                }
                Instruction::Load(i) => {
                    stack[sp] = args[i];
                    sp += 1;
                }
                Instruction::Add => {
                    sp -= 1;
                    stack[sp - 1] += stack[sp];
                }
                Instruction::Sub => {
                    sp -= 1;
                    stack[sp - 1] -= stack[sp];
                }
                Instruction::Mul => {
                    sp -= 1;
                    stack[sp - 1] *= stack[sp];
                }
                Instruction::Div => {
                    sp -= 1;
                    stack[sp - 1] /= stack[sp];
                }
                Instruction::Neg => {
                    stack[sp - 1] = -stack[sp - 1];
                }
                Instruction::Pow => {
                    sp -= 1;
                    stack[sp - 1] = stack[sp - 1].powf(stack[sp]);
                }
                Instruction::Ln => {
                    stack[sp - 1] = stack[sp - 1].ln();
                }
                Instruction::Exp => {
                    stack[sp - 1] = stack[sp - 1].exp();
                }
            }
        }
        stack[0]
    }
}

/// Single-pass lowering with stack-depth bookkeeping.
struct Lowering<'a> {
    slots: &'a FxHashMap<Symbol, usize>,
    instructions: Vec<Instruction>,
    depth: usize,
    max_depth: usize,
}

impl Lowering<'_> {
    fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn combine(&mut self, instr: Instruction) {
        self.instructions.push(instr);
        self.depth -= 1;
    }

    fn unary(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    fn emit(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Num(n) => {
                if !n.is_finite() {
                    return Err(Error::NonFiniteConstant(*n));
                }
                self.push(Instruction::Const(*n));
            }
            Expr::Sym(s) => match self.slots.get(s) {
                Some(&i) => self.push(Instruction::Load(i)),
                None => return Err(Error::UnboundSymbol(s.clone())),
            },
            Expr::Add(terms) => {
                if terms.is_empty() {
                    return Err(Error::EmptyOperands("sum"));
                }
                for (i, t) in terms.iter().enumerate() {
                    // A term with a -1 coefficient lowers to a subtraction.
                    if i > 0 {
                        if let Some(negated) = as_negation(t) {
                            self.emit(negated)?;
                            self.combine(Instruction::Sub);
                            continue;
                        }
                    }
                    self.emit(t)?;
                    if i > 0 {
                        self.combine(Instruction::Add);
                    }
                }
            }
            Expr::Mul(factors) => {
                if factors.is_empty() {
                    return Err(Error::EmptyOperands("product"));
                }
                // A leading -1 coefficient is a negation, not a multiply.
                if factors.len() == 2 {
                    if let Some(negated) = as_negation(expr) {
                        self.emit(negated)?;
                        self.unary(Instruction::Neg);
                        return Ok(());
                    }
                }
                for (i, x) in factors.iter().enumerate() {
                    match x {
                        // x * b^-1 lowers to a division.
                        Expr::Pow(base, exponent)
                            if i > 0 && matches!(exponent.as_ref(), Expr::Num(e) if *e == -1.0) =>
                        {
                            self.emit(base)?;
                            self.combine(Instruction::Div);
                        }
                        _ => {
                            self.emit(x)?;
                            if i > 0 {
                                self.combine(Instruction::Mul);
                            }
                        }
                    }
                }
            }
            Expr::Pow(base, exponent) => {
                self.emit(base)?;
                self.emit(exponent)?;
                self.combine(Instruction::Pow);
            }
            Expr::Ln(arg) => {
                self.emit(arg)?;
                self.unary(Instruction::Ln);
            }
            Expr::Exp(arg) => {
                self.emit(arg)?;
                self.unary(Instruction::Exp);
            }
        }
        Ok(())
    }
}

/// Matches `(-1) * x` and returns `x`.
fn as_negation(expr: &Expr) -> Option<&Expr> {
    if let Expr::Mul(factors) = expr {
        if let [Expr::Num(c), rest] = factors.as_slice() {
            if *c == -1.0 {
                return Some(rest);
            }
        }
    }
    None
}
