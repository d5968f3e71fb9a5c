use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Parsing errors
    #[error("Invalid hex value: {0}")]
    InvalidHex(String),

    #[error("Invalid integer value: {0}")]
    InvalidInteger(String),

    // Structure errors
    #[error("Service group must not be empty")]
    EmptyServiceGroup,
}

pub type Result<T> = std::result::Result<T, Error>;
