//! Error types for eutectic-core.

use thiserror::Error;

/// Result type for eutectic-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building callables and phase records.
///
/// Everything here is a configuration mismatch or a propagated collaborator
/// failure; all operations are deterministic, so none of these are worth
/// retrying with the same inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested output property is not a recognized property name.
    #[error("unrecognized output property: {0}")]
    UnrecognizedProperty(String),

    /// The property name is recognized but the phase's model does not
    /// define an expression for it.
    #[error("model for phase {phase} has no {property} expression")]
    MissingProperty { phase: String, property: String },

    /// A phase was requested but no model was supplied for it.
    #[error("no model supplied for phase: {0}")]
    MissingModel(String),

    /// A component is not present in the database's species registry.
    #[error("component not in database: {0}")]
    UnknownComponent(String),

    /// A pre-built callables bundle was supplied for a different output
    /// property than the one requested.
    #[error("callables were built for output {built}, but {requested} was requested")]
    OutputMismatch { built: String, requested: String },

    /// A pre-built callables bundle has no entry for a requested phase.
    #[error("callables bundle has no entry for phase {0}")]
    MissingCallables(String),

    /// Expression compilation failed.
    #[error("expression compilation failed for phase {phase}: {source}")]
    Compile {
        phase: String,
        #[source]
        source: eutectic_expr::Error,
    },

    /// Constraint construction failed.
    #[error("constraint construction failed for phase {phase}: {message}")]
    Constraint { phase: String, message: String },
}
