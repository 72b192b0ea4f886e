//! Error types for MBO → MBP-10 reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Main error type for reconstruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// A numeric or enum field could not be decoded
    #[error("Failed to parse {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    /// Row has the wrong number of fields
    #[error("Malformed row: expected {expected} fields, found {found}")]
    MalformedRow { expected: usize, found: usize },

    /// Row-level error annotated with its input line
    #[error("Line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: Box<BookError>,
    },

    /// Add for an order id that is already live
    #[error("Duplicate order ID: {0}")]
    DuplicateOrder(u64),

    /// Cancel for an order id that is not live
    #[error("Unknown order ID: {0}")]
    UnknownOrder(u64),

    /// Order index and ladders disagree
    #[error("Book inconsistency: {0}")]
    InconsistentState(String),

    /// I/O failure in a collaborator (source or sink)
    #[error("IO error: {0}")]
    Io(String),

    /// CSV tokenizing or writing failure
    #[error("CSV error: {0}")]
    Csv(String),
}

impl BookError {
    /// Create a parse error for `field` holding the offending text.
    pub fn parse(field: &'static str, value: impl Into<String>) -> Self {
        BookError::Parse {
            field,
            value: value.into(),
        }
    }

    /// Attach an input line number to this error.
    pub fn at_line(self, line: u64) -> Self {
        BookError::Row {
            line,
            source: Box::new(self),
        }
    }

    /// True for errors caused by undecodable input rows.
    ///
    /// These are the only errors a skip-row source may swallow.
    pub fn is_parse_error(&self) -> bool {
        match self {
            BookError::Parse { .. } | BookError::MalformedRow { .. } => true,
            BookError::Row { source, .. } => source.is_parse_error(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        BookError::Io(err.to_string())
    }
}

impl From<csv::Error> for BookError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(io) => BookError::Io(io.to_string()),
            _ => BookError::Csv(err.to_string()),
        }
    }
}
