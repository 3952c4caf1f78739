//! Error types for UTXO encoding and set operations

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoError {
    #[error("Decoding failed: {0}")]
    Decoding(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Checksum mismatch: expected {expected}, found {found}")]
    Checksum { expected: String, found: String },

    #[error("Invalid merge rule: {0}")]
    InvalidRule(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, UtxoError>;
