//! Compilation pipeline for phase models.
//!
//! This module provides:
//! - Callable building (symbolic expressions → evaluator bundle)
//! - Record assembly (callables + constraints + parameters → phase records)
//! - Pipeline options (parameter handling, derivative build flags)
//!
//! # Architecture
//!
//! ```text
//! Database + Models + Output
//!     │
//!     ├── build_callables ──► Callables (per-phase function/gradient/Hessian
//!     │                           │       + per-element mass evaluators)
//!     │                           │
//!     └── build_phase_records ◄───┘ (or build_phase_records_unchecked,
//!                 │                  reusing a caller-supplied bundle)
//!                 │
//!                 └──► PhaseRecord per phase (+ constraint evaluators,
//!                      resolved parameter values), keyed by uppercase name
//! ```

mod callables;
mod records;
mod types;

pub use callables::build_callables;
pub use records::{build_phase_records, build_phase_records_unchecked};
pub use types::{
    CallableOptions, Callables, CallablesBuild, PhaseRecord, RecordOptions, RecordsBuild,
};
