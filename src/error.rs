/*!
Error type shared by the data generator and the diagnostics engine.

Every operation validates its input before computing anything, so an error
always means no partial output was produced.
*/

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DiagnosticsError>;

/// Failure conditions of the generator and diagnostics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosticsError {
    /// A generator or configuration argument is out of range.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Standardization of a vector whose variance is zero.
    #[error("cannot standardize a vector with zero variance (all {len} values equal {value})")]
    DivisionByZero { len: usize, value: f64 },

    /// A chain, collection or vector without any values.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Fewer chains than an across-chain statistic needs.
    #[error("at least {required} chains are required, found {found}")]
    InsufficientChains { required: usize, found: usize },

    /// Fewer draws per chain than a statistic needs.
    #[error("at least {required} draws per chain are required, found {found}")]
    InsufficientSamples { required: usize, found: usize },

    /// A requested parameter is not monitored by the chain collection.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    /// Chains disagree in length or parameter set, or a shape is inconsistent.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl DiagnosticsError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        DiagnosticsError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}
