//! Error type shared by variable construction, engine selection and evaluation.

use crate::symbolic::Shape;

/// Result type for fallible operations in this crate.
pub type MetanetResult<T> = Result<T, MetanetError>;

/// Errors raised while building or evaluating METANET expressions.
///
/// Arithmetic edge cases (division by zero, negative queues, `exp`/`pow`
/// domain issues) are never reported here; they surface as `inf`/`NaN` in the
/// evaluated result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetanetError {
    /// Variable requested with more than two dimensions
    #[error("variable `{name}` requested with {ndim} dimensions; only 1D and 2D variables are supported")]
    InvalidShape { name: String, ndim: usize },
    /// Unrecognized symbolic representation name
    #[error("symbolic type must be in {{{valid}}}; got {got} instead")]
    UnknownSymType { got: String, valid: String },
    /// Unrecognized ramp-metering policy name
    #[error("ramp metering type must be in {{in, out}}; got {0} instead")]
    UnknownRampMetering(String),
    /// Symbol without a value in the evaluation environment
    #[error("symbol `{0}` is not bound to a value")]
    UnboundSymbol(String),
    /// Bound value does not match the shape of its variable
    #[error("symbol `{name}` has shape {expected}, but the bound value has shape {found}")]
    BindingShape { name: String, expected: Shape, found: Shape },
}
