use std::fmt;
use std::path::PathBuf;

/// The axis of a table that failed the minimum-size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Rows,
    Columns,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Rows => write!(f, "rows"),
            Dimension::Columns => write!(f, "columns"),
        }
    }
}

/// Every way a reduction run can fail.
///
/// All variants are terminal for the run: the pipeline stops, no output
/// artifact is written and the error is handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error("unable to read the input as a rectangular table: {reason}")]
    SourceUnreadable { reason: String },

    #[error("input data should have at least {required} {dimension}, found {found}")]
    ShapeTooSmall {
        dimension: Dimension,
        required: usize,
        found: usize,
    },

    #[error("input data contains a non-numeric value {value:?} at row {row}, column {column}")]
    NonNumericValue {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row} is equal to the column mean, its normalized contribution is undefined")]
    DegenerateRow { row: usize },

    #[error("eigendecomposition failed: {reason}")]
    NumericDecompositionFailure { reason: String },

    #[error("requested {requested} components but only {available} are available")]
    InvalidComponentCount { requested: usize, available: usize },

    #[error("exponent alpha must be a positive finite number, got {alpha}")]
    InvalidExponent { alpha: f64 },

    #[error("unable to write output to {}: {reason}", path.display())]
    SinkUnwritable { path: PathBuf, reason: String },
}

impl ReduceError {
    pub(crate) fn unreadable(reason: impl fmt::Display) -> Self {
        ReduceError::SourceUnreadable {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decomposition(reason: impl fmt::Display) -> Self {
        ReduceError::NumericDecompositionFailure {
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReduceError>;
