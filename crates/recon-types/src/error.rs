use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid contact id: {0}")]
    InvalidContactId(String),

    #[error("invalid link precedence: {0}")]
    InvalidPrecedence(String),
}
