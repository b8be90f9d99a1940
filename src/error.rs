use thiserror::Error;

/// Call-level usage errors raised by the predictors and table loaders.
///
/// These abort a whole call before any element is evaluated. Per-element
/// problems (unknown sex code, age out of range, lookup miss) are never errors;
/// they surface as `None` in the output slot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpiroError {
    #[error("input vectors must have equal length (got {})", format_lengths(.lengths))]
    LengthMismatch { lengths: Vec<(&'static str, usize)> },

    #[error("unknown {reference} measure `{value}` (expected one of: {expected})")]
    UnknownMeasure {
        reference: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("`measure` must hold a single repeated value, found `{first}` and `{other}`")]
    MixedMeasures { first: String, other: String },

    #[error("`measure` vector has length {got}, expected 1 or {expected}")]
    MeasureLength { got: usize, expected: usize },

    #[error("exactly one observed spirometry measure must be supplied, got none")]
    NoObservedMeasure,

    #[error("exactly one observed spirometry measure must be supplied, got {}", .supplied.join(", "))]
    MultipleObservedMeasures { supplied: Vec<&'static str> },

    #[error("invalid sex `{value}` at position {index}: expected \"m\", \"f\" or missing")]
    InvalidWangSex { index: usize, value: String },

    #[error("duplicate coefficient row for {key}")]
    DuplicateRow { key: String },

    #[error("invalid coefficient table: {0}")]
    InvalidTable(String),
}

fn format_lengths(lengths: &[(&'static str, usize)]) -> String {
    lengths
        .iter()
        .map(|(name, len)| format!("{name}={len}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error surfaced by the `spiro` binary, carrying its process exit code.
///
/// Exit codes: 2 = usage/input error, 3 = nothing evaluated, 4 = output failure.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SpiroError> for AppError {
    fn from(err: SpiroError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
