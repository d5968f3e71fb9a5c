use felica_hardware::TagError;
use thiserror::Error;

/// Errors that abort a card session.
///
/// Per-group failures never surface here; they are recorded in that
/// group's result instead.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The transceiver failed outside a group read
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// The card reported a structure the engine cannot represent
    #[error("Invalid card structure: {0}")]
    Structure(#[from] felica_core::Error),
}

/// Specialized result type for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;
