//! Error types for transceiver and key-derivation operations.
//!
//! [`TagError::CommandError`] is special: the card answers a read past the
//! last block with a command error, so the read engine treats it as the end
//! of data rather than a failure.

/// Result type alias for tag operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// Errors that can occur while talking to a FeliCa tag.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// The card rejected the command with a status flag pair.
    #[error("Command error: status 0x{status:04X}")]
    CommandError { status: u16 },

    /// The card did not answer in time.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The RF channel failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Mutual authentication was rejected.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Session key derivation failed.
    #[error("Key derivation failed: {message}")]
    KeyDerivation { message: String },

    /// The card answered with something that could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The operation is not supported by this tag.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// A card image could not be loaded.
    #[error("Invalid card image: {message}")]
    InvalidImage { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagError {
    pub fn command_error(status: u16) -> Self {
        Self::CommandError { status }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    pub fn key_derivation(message: impl Into<String>) -> Self {
        Self::KeyDerivation {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// True for the protocol-level "no more data" signal.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::CommandError { .. })
    }
}
