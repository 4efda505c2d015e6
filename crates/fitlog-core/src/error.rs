use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide errors that are not tied to a single submission.
#[derive(Error, Debug)]
pub enum FitlogError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A date argument did not match any recognised format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the fitlog crates.
pub type Result<T> = std::result::Result<T, FitlogError>;

// ── ParseError ────────────────────────────────────────────────────────────────

/// Failures of the line-oriented workout notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Too few segments, or a segment lacks its unit keyword.
    #[error("Malformed workout line: {0}")]
    MalformedLine(String),

    /// A numeric segment held text that is not a finite number.
    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

// ── IngestError ───────────────────────────────────────────────────────────────

/// User-input errors raised while validating a workout submission.
///
/// Every variant maps to a 4xx-equivalent status; see [`IngestError::status_code`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Workout submission is missing")]
    MissingSubmission,

    #[error("No categories found in workout submission")]
    MissingCategory,

    /// Fewer than five of the six recognised fields were supplied.
    #[error("Workout submission is incomplete: only {present} of 6 fields supplied")]
    IncompleteFields { present: usize },

    #[error("Please enter the workout in the proper format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must not be negative")]
    NegativeValue { field: &'static str },

    /// Weight and duration are finite but their calorie product is not.
    #[error("weight {weight} kg over {duration} min is out of range")]
    CaloriesOutOfRange { weight: f64, duration: f64 },

    /// A workout inside a notation block failed to parse (1-based index).
    #[error("Workout {workout}: {source}")]
    Parse {
        workout: usize,
        #[source]
        source: ParseError,
    },
}

impl IngestError {
    /// HTTP-equivalent status reported to callers.
    pub fn status_code(&self) -> u16 {
        400
    }
}

// ── StoreError ────────────────────────────────────────────────────────────────

/// Failures of the storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A store file could not be opened, read or written.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialise workout record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
