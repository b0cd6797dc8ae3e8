//! Display boundary

use lotto_core::{Board, DrawResult};
use thiserror::Error;

use crate::state::MessageRef;

#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("Display unavailable: {0}")]
    Unavailable(String),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageRef),
}

/// Renders immutable engine data; holds no lottery logic.
#[async_trait::async_trait]
pub trait Presenter: Send + Sync {
    /// Show the live board, editing `existing` when given. Afterwards
    /// [`Presenter::current_fingerprint`] reports `board.fingerprint()`.
    async fn show_board(
        &self,
        board: &Board,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError>;

    /// Replace `existing` (the last board) with a draw's results
    async fn show_results(
        &self,
        result: &DrawResult,
        existing: Option<&MessageRef>,
    ) -> Result<MessageRef, PresenterError>;

    /// Fingerprint of the board currently on display
    fn current_fingerprint(&self) -> Option<String>;
}
