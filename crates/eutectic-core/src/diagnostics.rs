//! Structured diagnostics returned alongside build results.
//!
//! Warnings here are part of the result value, not just a log line: callers
//! get the full list back from every build and can inspect it
//! programmatically. The `tracing` events the pipeline emits mirror these
//! entries but are not the source of truth.

use serde::{Deserialize, Serialize};

use crate::vars::StateVariable;

/// One diagnostic event from a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// The effective state-variable set differs from the conventional
    /// `{N, P, T}`. The build proceeds; results are only meaningful if the
    /// caller intended the non-standard set.
    NonConventionalStateVariables { found: Vec<StateVariable> },

    /// Callables for one phase were compiled.
    PhaseCompiled { phase: String },

    /// A record for one phase was assembled.
    PhaseAssembled { phase: String },
}

impl Diagnostic {
    /// Whether this entry signals something the caller should look at, as
    /// opposed to progress reporting.
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::NonConventionalStateVariables { .. })
    }
}

/// Diagnostics accumulated over one build, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, entry: Diagnostic) {
        self.entries.push(entry);
    }

    /// Append all of `other`, preserving order.
    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Only the entries that warrant caller attention.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_warning())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
