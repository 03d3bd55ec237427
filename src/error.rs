use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Expression parsing
// ---------------------------------------------------------------------------

/// Malformed expression text.
///
/// `MismatchedParentheses` is kept apart from the generic variants because
/// the UI shows it verbatim to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Mismatched parentheses")]
    MismatchedParentheses,

    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Not a rational function of {var}: {reason}")]
    NotRational { var: String, reason: String },
}

// ---------------------------------------------------------------------------
// File import
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {format} file: {reason}")]
    Malformed { format: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Dataset / dataline lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("Field '{field}' not found in case {case}")]
    FieldNotFound { field: String, case: usize },

    #[error("Case {index} out of range ({count} cases)")]
    CaseIndexOutOfRange { index: usize, count: usize },

    #[error("Fields '{x}' ({x_len} samples) and '{y}' ({y_len} samples) differ in length in case {case}")]
    LengthMismatch {
        x: String,
        y: String,
        x_len: usize,
        y_len: usize,
        case: usize,
    },

    #[error("Dataset was removed")]
    DatasetRemoved,

    #[error("Dataline was removed")]
    DatalineRemoved,
}

// ---------------------------------------------------------------------------
// Transfer function evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Transfer function is not realizable (numerator degree {num_degree} > denominator degree {den_degree})")]
    NotRealizable { num_degree: usize, den_degree: usize },

    #[error("Invalid time base: {0}")]
    InvalidTimeBase(String),

    #[error("Input has {input} samples but the time base has {time}")]
    InputLength { input: usize, time: usize },

    #[error("Dataset has no transfer function")]
    MissingTransferFunction,

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
