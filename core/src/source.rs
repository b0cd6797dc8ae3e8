//! Boundary to the guild transaction log

use thiserror::Error;

use crate::transaction::RawLogEntry;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Pull-based feed of treasury log entries
#[async_trait::async_trait]
pub trait TransactionSource: Send + Sync {
    /// Entries newer than `cursor` (all available entries when `None`)
    async fn fetch_since(&self, cursor: Option<u64>) -> Result<Vec<RawLogEntry>, SourceError>;
}
