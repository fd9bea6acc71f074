//! Error types for license tokens

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Name too short (minimum 3 characters)")]
    NameTooShort,

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Invalid token id")]
    InvalidTokenId,

    #[error("Invalid expiry policy: {0}")]
    InvalidPolicy(String),
}
