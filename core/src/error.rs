//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Malformed record {id:?}: {reason}")]
    MalformedRecord { id: Option<u64>, reason: String },

    #[error("Invalid interval key: {0}")]
    InvalidInterval(String),

    #[error("Invalid prize split: {0}")]
    InvalidPrizeSplit(String),

    #[error("Invalid lottery rules: {0}")]
    InvalidRules(String),

    #[error("Draw verification failed for {interval}: {reason}")]
    VerificationFailed { interval: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
