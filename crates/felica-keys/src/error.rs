use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a key source.
///
/// None of these are fatal to a session: the key table logs them and hands
/// out an empty key map instead.
#[derive(Debug, Error)]
pub enum KeyTableError {
    /// The key file does not exist
    #[error("{} not found", .path.display())]
    NotFound { path: PathBuf },

    /// Reading the key file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV text itself is malformed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The header lacks a required column
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A row could not be parsed; the whole batch is rejected
    #[error("Invalid row at line {line}: {message}")]
    InvalidRow { line: usize, message: String },
}

/// Specialized result type for key table operations
pub type KeyTableResult<T> = Result<T, KeyTableError>;
