//! Error types for asignar operations.
//!
//! Provides structured error context for library consumers.

use std::fmt;

/// Main error type for asignar operations.
///
/// Every recognized failure of an allocation run is reported through this
/// enum rather than a panic; callers match on the variant or format the
/// message for their boundary.
///
/// # Examples
///
/// ```
/// use asignar::error::AsignarError;
///
/// let err = AsignarError::InsufficientData {
///     message: "student batch is empty".to_string(),
/// };
/// assert!(err.to_string().contains("Insufficient data"));
/// ```
#[derive(Debug)]
pub enum AsignarError {
    /// The student batch cannot support an allocation run (empty batch).
    InsufficientData {
        /// What was missing
        message: String,
    },

    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for AsignarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsignarError::InsufficientData { message } => {
                write!(f, "Insufficient data: {message}")
            }
            AsignarError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
            AsignarError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            AsignarError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for AsignarError {}

impl From<&str> for AsignarError {
    fn from(msg: &str) -> Self {
        AsignarError::Other(msg.to_string())
    }
}

impl From<String> for AsignarError {
    fn from(msg: String) -> Self {
        AsignarError::Other(msg)
    }
}

impl AsignarError {
    /// Create an empty-input error.
    #[must_use]
    pub fn insufficient_data(context: &str) -> Self {
        Self::InsufficientData {
            message: context.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, AsignarError>;
